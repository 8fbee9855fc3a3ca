//! Authenticated user and session models

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Metadata attached to the auth user at sign-up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Represents an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            user_metadata: UserMetadata::default(),
        }
    }

    /// First letter of the email, upper-cased, for the avatar badge
    pub fn initial(&self) -> Option<char> {
        self.email.chars().next().map(|c| c.to_ascii_uppercase())
    }
}

/// Auth session as issued by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix seconds. Missing values are filled in from `expires_in`.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Fill `expires_at` from `expires_in` if the server omitted it
    pub fn with_expiry(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(Utc::now().timestamp() + self.expires_in);
        }
        self
    }

    /// True when the access token expires within `margin_secs`
    pub fn expires_within(&self, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(at) => at - Utc::now().timestamp() <= margin_secs,
            None => false,
        }
    }
}
