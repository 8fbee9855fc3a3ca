//! Profile service - profile row, account changes and avatar upload

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::{
    image_content_type, ProfileForm, ProfileUpdate, UserProfile, AVATAR_BUCKET, MAX_AVATAR_BYTES,
};
use crate::ports::{first_row, Backend, TableQuery, UserChanges};
use crate::services::session::SessionManager;

const TABLE: &str = "profiles";

/// Profile row for `user_id`, if one exists
pub async fn fetch_profile(
    backend: &dyn Backend,
    access_token: &str,
    user_id: &str,
) -> Result<Option<UserProfile>> {
    let rows = backend
        .select(access_token, &TableQuery::from(TABLE).eq("id", user_id))
        .await?;
    match first_row(rows) {
        Ok(profile) => Ok(Some(profile)),
        Err(Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub struct ProfileService {
    backend: Arc<dyn Backend>,
    session: Arc<SessionManager>,
}

impl ProfileService {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionManager>) -> Self {
        Self { backend, session }
    }

    pub async fn get(&self) -> Result<Option<UserProfile>> {
        let (token, user_id) = self.session.authenticated().await?;
        fetch_profile(self.backend.as_ref(), &token, &user_id).await
    }

    /// Editable values with defaults filled in
    pub async fn load_form(&self) -> Result<ProfileForm> {
        let profile = self.get().await?;
        let user = self
            .session
            .current()
            .map(|s| s.user)
            .ok_or(Error::NotAuthenticated)?;
        Ok(ProfileForm::resolve(&user, profile.as_ref()))
    }

    /// Apply an edit. Email/password go to the auth user first; if that
    /// fails nothing else is written.
    pub async fn update(&self, update: ProfileUpdate) -> Result<UserProfile> {
        let (token, user_id) = self.session.authenticated().await?;

        let changes = UserChanges {
            email: update
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from),
            password: update.password.clone().filter(|p| !p.is_empty()),
        };
        if !changes.is_empty() {
            let user = self.backend.update_user(&token, &changes).await?;
            self.session.update_user(user)?;
        }

        let mut form = self.load_form().await?;
        if let Some(v) = update.full_name {
            form.full_name = v.trim().to_string();
        }
        if let Some(v) = update.avatar_url {
            form.avatar_url = v;
        }
        if let Some(v) = update.currency {
            form.currency = v.trim().to_uppercase();
        }
        if let Some(v) = update.language {
            form.language = v.trim().to_string();
        }
        if let Some(v) = update.theme {
            form.theme = v;
        }

        let patch = json!({
            "full_name": form.full_name,
            "avatar_url": form.avatar_url,
            "currency": form.currency,
            "language": form.language,
            "theme": form.theme,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .backend
            .update(&token, &TableQuery::from(TABLE).eq("id", user_id.as_str()), patch.clone())
            .await?;
        if !rows.is_empty() {
            return first_row(rows);
        }

        // No profile row yet (e.g. OAuth sign-up): create it
        debug!("profile row missing, creating it");
        let mut row = patch;
        row["id"] = json!(user_id);
        if let Some(session) = self.session.current() {
            row["email"] = json!(session.user.email);
        }
        first_row(self.backend.upsert(&token, TABLE, row).await?)
    }

    /// Upload an avatar image and return its public URL
    pub async fn upload_avatar(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let (content_type, ext) = image_content_type(file_name)
            .ok_or_else(|| Error::validation("Please select an image file"))?;
        if bytes.len() > MAX_AVATAR_BYTES {
            return Err(Error::validation("Image must be smaller than 5MB"));
        }

        let (token, user_id) = self.session.authenticated().await?;
        let path = format!(
            "{}/avatar-{}.{}",
            user_id,
            Utc::now().timestamp_millis(),
            ext
        );

        self.backend
            .upload(&token, AVATAR_BUCKET, &path, bytes, content_type, true)
            .await?;
        self.backend.public_url(AVATAR_BUCKET, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::supabase_mock::{signed_in, MockConfig, MockSupabaseServer, MOCK_USER_ID};
    use crate::domain::Theme;
    use tempfile::{tempdir, TempDir};

    fn service(config: MockConfig) -> (MockSupabaseServer, ProfileService, TempDir) {
        let server = MockSupabaseServer::start(config).unwrap();
        let dir = tempdir().unwrap();
        let (backend, session) = signed_in(&server, dir.path());
        (server, ProfileService::new(backend, session), dir)
    }

    #[tokio::test]
    async fn test_load_form_tolerates_unknown_theme() {
        let (_server, svc, _dir) = service(MockConfig {
            rows: vec![serde_json::json!({"id": MOCK_USER_ID, "theme": "system", "language": "si"})],
            ..Default::default()
        });
        let form = svc.load_form().await.unwrap();
        assert_eq!(form.theme, Theme::Light);
        assert_eq!(form.language, "si");
    }

    #[tokio::test]
    async fn test_avatar_rejections() {
        let (server, svc, _dir) = service(MockConfig::default());

        let err = svc.upload_avatar("notes.txt", vec![1]).await.unwrap_err();
        assert!(err.to_string().contains("Please select an image file"));

        let err = svc
            .upload_avatar("big.png", vec![0; MAX_AVATAR_BYTES + 1])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Image must be smaller than 5MB"));
        assert!(server.last_request("POST", "/storage/").is_none());
    }

    #[tokio::test]
    async fn test_avatar_upload_path() {
        let (server, svc, _dir) = service(MockConfig::default());
        let url = svc.upload_avatar("me.JPG", vec![1, 2, 3]).await.unwrap();

        let prefix = format!("/storage/v1/object/avatars/{}/avatar-", MOCK_USER_ID);
        let req = server.last_request("POST", &prefix).unwrap();
        assert!(req.path.ends_with(".jpg"));
        assert!(req.has_header("content-type", "image/jpeg"));
        assert!(url.contains("/storage/v1/object/public/avatars/"));
    }

    #[tokio::test]
    async fn test_update_changes_auth_then_profile() {
        let (server, svc, _dir) = service(MockConfig::default());
        let profile = svc
            .update(ProfileUpdate {
                email: Some("new@example.com".to_string()),
                full_name: Some("Ada".to_string()),
                theme: Some(Theme::Dark),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(profile.theme, Some(Theme::Dark));

        let requests = server.requests();
        let auth_pos = requests.iter().position(|r| r.method == "PUT").unwrap();
        let patch_pos = requests.iter().position(|r| r.method == "PATCH").unwrap();
        assert!(auth_pos < patch_pos);

        let patch = requests[patch_pos].body_json();
        assert_eq!(patch["currency"], "LKR");
        assert_eq!(patch["language"], "en");
        assert!(patch["updated_at"].is_string());
        assert!(requests[patch_pos].path.contains(&format!("id=eq.{}", MOCK_USER_ID)));
    }

    #[tokio::test]
    async fn test_update_creates_missing_row() {
        let (server, svc, _dir) = service(MockConfig {
            empty_updates: true,
            ..Default::default()
        });
        svc.update(ProfileUpdate {
            currency: Some("usd".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        let req = server.last_request("POST", "/rest/v1/profiles").unwrap();
        assert_eq!(req.body_json()["currency"], "USD");
        assert_eq!(req.body_json()["id"], MOCK_USER_ID);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_update() {
        let (server, svc, _dir) = service(MockConfig {
            rate_limit: true,
            ..Default::default()
        });
        let err = svc
            .update(ProfileUpdate {
                password: Some("Secret123".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Rate limit"));
        assert!(server.last_request("PATCH", "/rest/v1/profiles").is_none());
    }
}
