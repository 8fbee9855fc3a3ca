//! Field validation rules for the auth forms
//!
//! Each rule returns `None` for a valid value or the message to display.

use std::sync::OnceLock;

use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z\s]+$").expect("valid name regex"))
}

pub fn validate_email(value: &str) -> Option<String> {
    if value.is_empty() {
        return Some("Email is required".to_string());
    }
    if !email_regex().is_match(value) {
        return Some("Please enter a valid email address".to_string());
    }
    None
}

/// Sign-in rule: present and long enough
pub fn validate_login_password(value: &str) -> Option<String> {
    if value.is_empty() {
        return Some("Password is required".to_string());
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Some(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    None
}

/// Rule for a password being set: the sign-in rule plus character classes
pub fn validate_new_password(value: &str) -> Option<String> {
    if let Some(err) = validate_login_password(value) {
        return Some(err);
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("Password must contain at least one lowercase letter".to_string());
    }
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("Password must contain at least one uppercase letter".to_string());
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain at least one number".to_string());
    }
    None
}

pub fn validate_confirm_password(confirm: &str, password: &str) -> Option<String> {
    if confirm.is_empty() {
        return Some("Please confirm your password".to_string());
    }
    if confirm != password {
        return Some("Passwords do not match".to_string());
    }
    None
}

pub fn validate_full_name(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some("Full name is required".to_string());
    }
    if trimmed.chars().count() < MIN_NAME_LEN {
        return Some(format!("Name must be at least {} characters", MIN_NAME_LEN));
    }
    if !name_regex().is_match(trimmed) {
        return Some("Name can only contain letters and spaces".to_string());
    }
    None
}
