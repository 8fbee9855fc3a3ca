//! Category domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// A user-defined label attached to transactions and budgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Category {
    /// Trim a proposed category name, rejecting blanks
    pub fn normalize_name(name: &str) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("Category name is required"));
        }
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(Category::normalize_name("  Groceries ").unwrap(), "Groceries");
        assert!(Category::normalize_name("   ").is_err());
    }
}
