//! User profile domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::user::User;

pub const DEFAULT_CURRENCY: &str = "LKR";
pub const DEFAULT_LANGUAGE: &str = "en";

/// Largest accepted avatar image
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Storage bucket holding avatar images
pub const AVATAR_BUCKET: &str = "avatars";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(Error::validation(format!("Unknown theme '{}'. Use light or dark", other))),
        }
    }
}

/// Row in the `profiles` table, keyed by the auth user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Unrecognised stored values read as unset
    #[serde(default, deserialize_with = "lenient_theme")]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn lenient_theme<'de, D>(deserializer: D) -> std::result::Result<Option<Theme>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok()))
}

/// Editable profile fields with defaults resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileForm {
    pub full_name: String,
    pub avatar_url: String,
    pub currency: String,
    pub language: String,
    pub theme: Theme,
}

impl ProfileForm {
    /// Resolve form values from the stored profile, falling back to the auth
    /// user's metadata for the name
    pub fn resolve(user: &User, profile: Option<&UserProfile>) -> Self {
        let metadata_name = user.user_metadata.full_name.clone().unwrap_or_default();
        match profile {
            Some(p) => Self {
                full_name: p
                    .full_name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(metadata_name),
                avatar_url: p.avatar_url.clone().unwrap_or_default(),
                currency: p
                    .currency
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                language: p
                    .language
                    .clone()
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                theme: p.theme.unwrap_or_default(),
            },
            None => Self {
                full_name: metadata_name,
                avatar_url: String::new(),
                currency: DEFAULT_CURRENCY.to_string(),
                language: DEFAULT_LANGUAGE.to_string(),
                theme: Theme::default(),
            },
        }
    }
}

/// A profile edit. Email/password changes go to the auth user, the rest to
/// the profile row.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub currency: Option<String>,
    pub language: Option<String>,
    pub theme: Option<Theme>,
}

/// Content type for an avatar file, judged by extension
pub fn image_content_type(file_name: &str) -> Option<(&'static str, String)> {
    let ext = file_name.rsplit_once('.')?.1.to_lowercase();
    let content_type = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some((content_type, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::UserMetadata;

    fn user_with_name(name: Option<&str>) -> User {
        User {
            id: "u1".to_string(),
            email: "a@b.co".to_string(),
            user_metadata: UserMetadata {
                full_name: name.map(String::from),
                avatar_url: None,
            },
        }
    }

    #[test]
    fn test_form_defaults_without_profile() {
        let form = ProfileForm::resolve(&user_with_name(Some("Ada Lovelace")), None);
        assert_eq!(form.full_name, "Ada Lovelace");
        assert_eq!(form.currency, "LKR");
        assert_eq!(form.language, "en");
        assert_eq!(form.theme, Theme::Light);
    }

    #[test]
    fn test_unknown_theme_falls_back_to_light() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id": "u1", "theme": "system", "currency": "USD"}"#).unwrap();
        assert_eq!(profile.theme, None);
        let form = ProfileForm::resolve(&user_with_name(None), Some(&profile));
        assert_eq!(form.theme, Theme::Light);
        assert_eq!(form.currency, "USD");

        let dark: UserProfile = serde_json::from_str(r#"{"id": "u1", "theme": "Dark"}"#).unwrap();
        assert_eq!(dark.theme, Some(Theme::Dark));
        let odd: UserProfile = serde_json::from_str(r#"{"id": "u1", "theme": 3}"#).unwrap();
        assert_eq!(odd.theme, None);
    }

    #[test]
    fn test_form_prefers_profile_values() {
        let profile = UserProfile {
            id: "u1".to_string(),
            email: None,
            full_name: Some("".to_string()),
            avatar_url: Some("https://cdn/a.png".to_string()),
            currency: Some("USD".to_string()),
            language: None,
            theme: Some(Theme::Dark),
            updated_at: None,
        };
        let form = ProfileForm::resolve(&user_with_name(Some("Meta Name")), Some(&profile));
        assert_eq!(form.full_name, "Meta Name");
        assert_eq!(form.currency, "USD");
        assert_eq!(form.language, "en");
        assert_eq!(form.theme, Theme::Dark);
    }

    #[test]
    fn test_image_content_type() {
        assert_eq!(image_content_type("me.JPG").unwrap().0, "image/jpeg");
        assert!(image_content_type("notes.txt").is_none());
        assert!(image_content_type("noext").is_none());
    }
}
