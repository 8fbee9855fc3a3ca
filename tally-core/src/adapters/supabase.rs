//! Supabase client
//!
//! Implements the auth, table and storage ports against a Supabase project
//! (GoTrue under `/auth/v1`, PostgREST under `/rest/v1`, storage under
//! `/storage/v1`). Every request carries the anon key as `apikey`, and the
//! user's access token (or the anon key) as the bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{Session, User, UserMetadata};
use crate::ports::{
    AuthProvider, Backend, OAuthProvider, ObjectStorage, SignUpResponse, TableQuery, TableStore,
    UserChanges,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Supabase HTTP client
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(Error::Config("Backend URL cannot be empty".to_string()));
        }
        if anon_key.trim().is_empty() {
            return Err(Error::Config("Backend anon key cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, access_token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, path, "supabase request");
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token.unwrap_or(&self.anon_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        check_response_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Network(format!("Failed to parse backend response: {}", e)))
    }

    async fn send_rows(&self, request: RequestBuilder) -> Result<Vec<JsonValue>> {
        let value: JsonValue = self.send_json(request).await?;
        Ok(match value {
            JsonValue::Array(rows) => rows,
            JsonValue::Null => Vec::new(),
            single => vec![single],
        })
    }

    /// Map transport errors to user-facing messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Network(format!(
                "Connection timed out after {} seconds",
                REQUEST_TIMEOUT_SECS
            ))
        } else if error.is_connect() {
            Error::Network("Unable to connect to the backend".to_string())
        } else {
            Error::Network(format!("Backend request failed: {}", error))
        }
    }

    async fn token_grant(&self, grant_type: &str, body: JsonValue) -> Result<Session> {
        let session: Session = self
            .send_json(
                self.request(Method::POST, "/auth/v1/token", None)
                    .query(&[("grant_type", grant_type)])
                    .json(&body),
            )
            .await?;
        Ok(session.with_expiry())
    }
}

/// Turn a non-success response into a backend error
async fn check_response_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(status.as_u16(), &body);
    warn!(status = status.as_u16(), "backend request failed");
    Err(Error::backend(status.as_u16(), message))
}

/// Pick the remote error message, falling back to a per-status default
pub fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<JsonValue>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(msg) = value.get(key).and_then(JsonValue::as_str) {
                if !msg.is_empty() {
                    return msg.to_string();
                }
            }
        }
    }
    match status {
        401 => "Your session has expired. Please sign in again.".to_string(),
        429 => "Rate limit exceeded. Please wait a moment and try again.".to_string(),
        status => format!("Backend error: HTTP {}", status),
    }
}

/// Sign-up returns a session when auto-confirm is on, otherwise the bare user
fn parse_sign_up(value: JsonValue) -> Result<SignUpResponse> {
    if value.get("access_token").is_some() {
        let session: Session = serde_json::from_value(value)?;
        let session = session.with_expiry();
        return Ok(SignUpResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }
    if let Some(user) = value.get("user").filter(|u| !u.is_null()) {
        return Ok(SignUpResponse {
            user: Some(serde_json::from_value(user.clone())?),
            session: None,
        });
    }
    if value.get("id").is_some() {
        return Ok(SignUpResponse {
            user: Some(serde_json::from_value(value)?),
            session: None,
        });
    }
    Ok(SignUpResponse::default())
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
        redirect_to: &str,
    ) -> Result<SignUpResponse> {
        let body = json!({
            "email": email,
            "password": password,
            "data": {
                "full_name": metadata.full_name,
                "avatar_url": metadata.avatar_url,
            },
        });
        let value: JsonValue = self
            .send_json(
                self.request(Method::POST, "/auth/v1/signup", None)
                    .query(&[("redirect_to", redirect_to)])
                    .json(&body),
            )
            .await?;
        parse_sign_up(value)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> Result<Session> {
        self.token_grant(
            "pkce",
            json!({ "auth_code": auth_code, "code_verifier": code_verifier }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.send(self.request(Method::POST, "/auth/v1/logout", Some(access_token)))
            .await?;
        Ok(())
    }

    async fn recover_password(&self, email: &str, redirect_to: &str) -> Result<()> {
        self.send(
            self.request(Method::POST, "/auth/v1/recover", None)
                .query(&[("redirect_to", redirect_to)])
                .json(&json!({ "email": email })),
        )
        .await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User> {
        self.send_json(self.request(Method::GET, "/auth/v1/user", Some(access_token)))
            .await
    }

    async fn update_user(&self, access_token: &str, changes: &UserChanges) -> Result<User> {
        self.send_json(
            self.request(Method::PUT, "/auth/v1/user", Some(access_token))
                .json(changes),
        )
        .await
    }

    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String> {
        let mut params: Vec<(&str, &str)> = vec![
            ("provider", provider.as_str()),
            ("redirect_to", redirect_to),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "s256"),
        ];
        params.extend_from_slice(provider.query_params());

        let url = Url::parse_with_params(&format!("{}/auth/v1/authorize", self.base_url), &params)
            .map_err(|e| Error::Config(format!("Invalid backend URL: {}", e)))?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl TableStore for SupabaseClient {
    async fn select(&self, access_token: &str, query: &TableQuery) -> Result<Vec<JsonValue>> {
        let path = format!("/rest/v1/{}", query.table);
        self.send_rows(
            self.request(Method::GET, &path, Some(access_token))
                .query(&query.to_query_pairs()),
        )
        .await
    }

    async fn insert(&self, access_token: &str, table: &str, row: JsonValue) -> Result<Vec<JsonValue>> {
        let path = format!("/rest/v1/{}", table);
        self.send_rows(
            self.request(Method::POST, &path, Some(access_token))
                .header("Prefer", "return=representation")
                .json(&row),
        )
        .await
    }

    async fn upsert(&self, access_token: &str, table: &str, row: JsonValue) -> Result<Vec<JsonValue>> {
        let path = format!("/rest/v1/{}", table);
        self.send_rows(
            self.request(Method::POST, &path, Some(access_token))
                .header("Prefer", "resolution=merge-duplicates,return=representation")
                .json(&row),
        )
        .await
    }

    async fn update(
        &self,
        access_token: &str,
        query: &TableQuery,
        patch: JsonValue,
    ) -> Result<Vec<JsonValue>> {
        let path = format!("/rest/v1/{}", query.table);
        self.send_rows(
            self.request(Method::PATCH, &path, Some(access_token))
                .query(&query.filter_pairs())
                .header("Prefer", "return=representation")
                .json(&patch),
        )
        .await
    }

    async fn delete(&self, access_token: &str, query: &TableQuery) -> Result<()> {
        let path = format!("/rest/v1/{}", query.table);
        self.send(
            self.request(Method::DELETE, &path, Some(access_token))
                .query(&query.filter_pairs()),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn upload(
        &self,
        access_token: &str,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        let object_path = format!("/storage/v1/object/{}/{}", bucket, path.trim_start_matches('/'));
        self.send(
            self.request(Method::POST, &object_path, Some(access_token))
                .header("Content-Type", content_type)
                .header("Cache-Control", "max-age=3600")
                .header("x-upsert", if upsert { "true" } else { "false" })
                .body(bytes),
        )
        .await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket,
            path.trim_start_matches('/')
        ))
    }
}

impl Backend for SupabaseClient {
    fn name(&self) -> &str {
        "supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_empty_settings() {
        assert!(SupabaseClient::new("", "anon").is_err());
        assert!(SupabaseClient::new("https://x.supabase.co", " ").is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SupabaseClient::new("https://x.supabase.co/", "anon").unwrap();
        assert_eq!(client.base_url(), "https://x.supabase.co");
    }

    #[test]
    fn test_error_message_extraction_order() {
        assert_eq!(
            extract_error_message(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            extract_error_message(422, r#"{"code":422,"msg":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(
            extract_error_message(409, r#"{"message":"duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(extract_error_message(500, "oops"), "Backend error: HTTP 500");
        assert!(extract_error_message(429, "").contains("Rate limit"));
        assert!(extract_error_message(401, "{}").contains("session has expired"));
    }

    #[test]
    fn test_authorize_url() {
        let client = SupabaseClient::new("https://x.supabase.co", "anon").unwrap();
        let url = client
            .authorize_url(OAuthProvider::Google, "http://localhost:5173/dashboard", "abc")
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.path(), "/auth/v1/authorize");
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("provider".to_string(), "google".to_string())));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
        assert!(pairs.contains(&("prompt".to_string(), "consent".to_string())));
        assert!(pairs.contains(&("code_challenge_method".to_string(), "s256".to_string())));
        assert!(pairs.contains(&(
            "redirect_to".to_string(),
            "http://localhost:5173/dashboard".to_string()
        )));
    }

    #[test]
    fn test_parse_sign_up_variants() {
        let pending = parse_sign_up(json!({"id": "u1", "email": "a@b.co"})).unwrap();
        assert!(pending.session.is_none());
        assert_eq!(pending.user.unwrap().id, "u1");

        let active = parse_sign_up(json!({
            "access_token": "at", "refresh_token": "rt", "expires_in": 3600,
            "user": {"id": "u1", "email": "a@b.co"}
        }))
        .unwrap();
        assert!(active.session.unwrap().expires_at.is_some());
    }

    #[test]
    fn test_public_url() {
        let client = SupabaseClient::new("https://x.supabase.co", "anon").unwrap();
        assert_eq!(
            client.public_url("avatars", "u1/avatar-1.png").unwrap(),
            "https://x.supabase.co/storage/v1/object/public/avatars/u1/avatar-1.png"
        );
    }
}
