//! Configuration management
//!
//! Settings live in `settings.json` in the tally directory:
//! ```json
//! {
//!   "app": { "demoMode": false, "siteUrl": "http://localhost:5173" },
//!   "backend": { "url": "https://xyz.supabase.co", "anonKey": "..." }
//! }
//! ```
//! Keys this crate does not manage are preserved on save. Environment
//! variables override the file for the current process only.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_SITE_URL: &str = "http://localhost:5173";

pub const ENV_DEMO_MODE: &str = "TALLY_DEMO_MODE";
pub const ENV_BACKEND_URL: &str = "TALLY_BACKEND_URL";
pub const ENV_BACKEND_ANON_KEY: &str = "TALLY_BACKEND_ANON_KEY";
pub const ENV_SITE_URL: &str = "TALLY_SITE_URL";

const MISSING_BACKEND: &str = "Backend settings are missing. Set TALLY_BACKEND_URL and TALLY_BACKEND_ANON_KEY or run 'tally setup'.";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    backend: BackendSection,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    site_url: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anon_key: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Hosted backend connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub url: String,
    pub anon_key: String,
}

/// Tally configuration (effective view of settings plus env overrides)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    pub site_url: String,
    pub backend: Option<BackendSettings>,
    // File contents, without env overrides, written back on save
    raw: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            demo_mode: false,
            site_url: DEFAULT_SITE_URL.to_string(),
            backend: None,
            raw: SettingsFile::default(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "TRUE" | "YES" => Some(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn read_settings(tally_dir: &Path) -> Result<SettingsFile> {
    let path = tally_dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

impl Config {
    /// Load config from the tally directory, applying `TALLY_*` overrides
    pub fn load(tally_dir: &Path) -> Result<Self> {
        Self::load_with_env(tally_dir, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup
    pub fn load_with_env(tally_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(tally_dir)?;

        let demo_mode = env(ENV_DEMO_MODE)
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(raw.app.demo_mode);

        let site_url = non_empty(env(ENV_SITE_URL))
            .or_else(|| non_empty(raw.app.site_url.clone()))
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string());

        let url = non_empty(env(ENV_BACKEND_URL)).or_else(|| non_empty(raw.backend.url.clone()));
        let anon_key = non_empty(env(ENV_BACKEND_ANON_KEY))
            .or_else(|| non_empty(raw.backend.anon_key.clone()));
        let backend = match (url, anon_key) {
            (Some(url), Some(anon_key)) => Some(BackendSettings { url, anon_key }),
            _ => None,
        };

        Ok(Self {
            demo_mode,
            site_url,
            backend,
            raw,
        })
    }

    /// Save config to the tally directory, preserving unmanaged settings
    pub fn save(&self, tally_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(tally_dir)?;
        let mut settings = read_settings(tally_dir)?;

        settings.app.demo_mode = self.raw.app.demo_mode;
        settings.app.site_url = self.raw.app.site_url.clone();
        settings.backend.url = self.raw.backend.url.clone();
        settings.backend.anon_key = self.raw.backend.anon_key.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(tally_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
        self.raw.app.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
        self.raw.app.demo_mode = false;
    }

    /// Store hosted backend settings
    pub fn set_backend(&mut self, url: &str, anon_key: &str) {
        let url = url.trim().trim_end_matches('/').to_string();
        let anon_key = anon_key.trim().to_string();
        self.raw.backend.url = Some(url.clone());
        self.raw.backend.anon_key = Some(anon_key.clone());
        self.backend = Some(BackendSettings { url, anon_key });
    }

    pub fn set_site_url(&mut self, site_url: &str) {
        let site_url = site_url.trim().trim_end_matches('/').to_string();
        self.raw.app.site_url = Some(site_url.clone());
        self.site_url = site_url;
    }

    /// Backend settings, or the setup hint when they are missing
    pub fn backend_settings(&self) -> Result<&BackendSettings> {
        self.backend.as_ref().ok_or_else(|| anyhow!(MISSING_BACKEND))
    }

    /// Absolute URL on the web app for auth redirects
    pub fn redirect_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.site_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
