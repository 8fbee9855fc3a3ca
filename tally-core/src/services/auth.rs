//! Auth service - sign up, sign in, OAuth, sign out and password recovery

use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::domain::result::{Error, Result};
use crate::domain::{Session, User, UserMetadata, UserProfile};
use crate::ports::{Backend, OAuthProvider, SignUpResponse, UserChanges};
use crate::services::profile::fetch_profile;
use crate::services::session::{AuthEvent, SessionManager};

const PKCE_VERIFIER_LEN: usize = 64;

pub const DASHBOARD_PATH: &str = "dashboard";
pub const RESET_PASSWORD_PATH: &str = "reset-password";

/// PKCE verifier and its S256 challenge
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(PKCE_VERIFIER_LEN)
            .map(char::from)
            .collect();
        let challenge = Self::challenge_for(&verifier);
        Self { verifier, challenge }
    }

    pub fn challenge_for(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
    }
}

fn find_param(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

/// Signed-in user with their profile row, if one exists
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub user: User,
    pub profile: Option<UserProfile>,
}

pub struct AuthService {
    backend: Arc<dyn Backend>,
    session: Arc<SessionManager>,
    email_redirect: String,
    reset_redirect: String,
}

impl AuthService {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionManager>, config: &Config) -> Self {
        Self {
            backend,
            session,
            email_redirect: config.redirect_url(DASHBOARD_PATH),
            reset_redirect: config.redirect_url(RESET_PASSWORD_PATH),
        }
    }

    /// Register and, when the backend signs the user straight in, create
    /// their profile row
    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<SignUpResponse> {
        let metadata = UserMetadata {
            full_name: Some(full_name.trim().to_string()),
            avatar_url: None,
        };
        let response = self
            .backend
            .sign_up(email.trim(), password, &metadata, &self.email_redirect)
            .await?;

        if let Some(session) = &response.session {
            self.session.set(session.clone(), AuthEvent::SignedIn)?;

            let profile = json!({
                "id": session.user.id,
                "email": session.user.email,
                "full_name": full_name.trim(),
            });
            if let Err(e) = self
                .backend
                .upsert(&session.access_token, "profiles", profile)
                .await
            {
                warn!(error = %e, "profile creation after sign-up failed");
            }
        }

        info!(confirmed = response.session.is_some(), "user signed up");
        Ok(response)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self
            .backend
            .sign_in_with_password(email.trim(), password)
            .await?;
        self.session.set(session.clone(), AuthEvent::SignedIn)?;
        Ok(session)
    }

    /// Browser URL for an OAuth sign-in; the PKCE verifier is kept until
    /// [`complete_redirect`](Self::complete_redirect)
    pub fn start_oauth(&self, provider: OAuthProvider) -> Result<String> {
        let pkce = Pkce::generate();
        let url = self
            .backend
            .authorize_url(provider, &self.email_redirect, &pkce.challenge)?;
        self.session.store_code_verifier(&pkce.verifier)?;
        Ok(url)
    }

    /// Finish a flow from the URL the browser landed on
    ///
    /// Handles both the OAuth `?code=` redirect and the `#access_token=`
    /// fragment of email links (confirmation, recovery).
    pub async fn complete_redirect(&self, redirect_url: &str) -> Result<AuthEvent> {
        let url = Url::parse(redirect_url.trim())
            .map_err(|e| Error::validation(format!("Invalid redirect URL: {}", e)))?;

        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let fragment: Vec<(String, String)> = url
            .fragment()
            .map(|f| {
                url::form_urlencoded::parse(f.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        for pairs in [&query, &fragment] {
            if let Some(err) = find_param(pairs, "error_description").or_else(|| find_param(pairs, "error")) {
                return Err(Error::Auth(err));
            }
        }

        if let Some(code) = find_param(&query, "code") {
            let verifier = self
                .session
                .take_code_verifier()?
                .ok_or_else(|| Error::Auth("No OAuth sign-in is in progress".to_string()))?;
            let session = self.backend.exchange_code(&code, &verifier).await?;
            self.session.set(session, AuthEvent::SignedIn)?;
            return Ok(AuthEvent::SignedIn);
        }

        let (Some(access_token), Some(refresh_token)) = (
            find_param(&fragment, "access_token"),
            find_param(&fragment, "refresh_token"),
        ) else {
            return Err(Error::Auth(
                "The link does not contain a sign-in code or tokens".to_string(),
            ));
        };

        let user = self.backend.get_user(&access_token).await?;
        let expires_in = find_param(&fragment, "expires_in")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);
        let expires_at = find_param(&fragment, "expires_at")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| Utc::now().timestamp() + expires_in);

        let session = Session {
            access_token,
            refresh_token,
            token_type: find_param(&fragment, "token_type").unwrap_or_else(|| "bearer".to_string()),
            expires_in,
            expires_at: Some(expires_at),
            user,
        };

        let event = if find_param(&fragment, "type").as_deref() == Some("recovery") {
            AuthEvent::PasswordRecovery
        } else {
            AuthEvent::SignedIn
        };
        self.session.set(session, event)?;
        Ok(event)
    }

    /// Revoke remotely, then always forget the session locally
    pub async fn sign_out(&self) -> Result<()> {
        let remote = match self.session.current() {
            Some(session) => self.backend.sign_out(&session.access_token).await,
            None => Ok(()),
        };
        self.session.clear()?;
        if let Err(e) = &remote {
            warn!(error = %e, "remote sign-out failed");
        }
        remote
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        self.backend
            .recover_password(email.trim(), &self.reset_redirect)
            .await
    }

    /// Set a new password on the signed-in (usually recovery) session
    pub async fn update_password(&self, password: &str) -> Result<User> {
        let (token, _) = self.session.authenticated().await?;
        let user = self
            .backend
            .update_user(
                &token,
                &UserChanges {
                    email: None,
                    password: Some(password.to_string()),
                },
            )
            .await?;
        self.session.update_user(user.clone())?;
        Ok(user)
    }

    pub async fn current_user(&self) -> Result<Option<CurrentUser>> {
        let Some(session) = self.session.current() else {
            return Ok(None);
        };
        let Some(token) = self.session.access_token().await? else {
            return Ok(None);
        };
        let profile = fetch_profile(self.backend.as_ref(), &token, &session.user.id).await?;
        Ok(Some(CurrentUser {
            user: self.session.current().map(|s| s.user).unwrap_or(session.user),
            profile,
        }))
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.current().is_some()
    }
}
