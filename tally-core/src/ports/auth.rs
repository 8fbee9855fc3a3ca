//! Authentication port

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{Session, User, UserMetadata};

/// External identity providers offered at sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }

    /// Extra query parameters the provider needs on the authorize URL
    pub fn query_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Google => &[("access_type", "offline"), ("prompt", "consent")],
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            other => Err(Error::validation(format!("Unsupported OAuth provider: {}", other))),
        }
    }
}

/// Result of registration
///
/// `session` is `None` when the backend requires email confirmation first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpResponse {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub session: Option<Session>,
}

/// Changes to the auth user record
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

/// Managed authentication
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new user with metadata and an email confirmation redirect
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
        redirect_to: &str,
    ) -> Result<SignUpResponse>;

    /// Password grant
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Refresh-token grant
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    /// PKCE grant: trade an authorization code for a session
    async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> Result<Session>;

    /// Revoke the session server-side
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Send a password recovery email
    async fn recover_password(&self, email: &str, redirect_to: &str) -> Result<()>;

    async fn get_user(&self, access_token: &str) -> Result<User>;

    async fn update_user(&self, access_token: &str, changes: &UserChanges) -> Result<User>;

    /// Browser URL that starts an OAuth flow
    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String>;
}
