//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Backend errors keep the remote service's message verbatim so it can be
/// shown to the user as-is.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("{0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a backend error from an HTTP status and remote message
    pub fn backend(status: u16, msg: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: msg.into(),
        }
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// HTTP status for backend errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result envelope, `{ data, error }`, used for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_operation_result_fail() {
        let result: OperationResult<i32> = OperationResult::fail("Invalid login credentials");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error, Some("Invalid login credentials".to_string()));
    }

    #[test]
    fn test_backend_message_passes_through() {
        let err = Error::backend(400, "Invalid login credentials");
        let result: OperationResult<i32> = OperationResult::fail(err.to_string());
        assert_eq!(result.error.as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn test_not_authenticated_message() {
        assert_eq!(Error::NotAuthenticated.to_string(), "User not authenticated");
        assert_eq!(Error::NotAuthenticated.status(), None);
        assert_eq!(Error::backend(429, "slow down").status(), Some(429));
    }
}
