//! Error types for Liftlog.
//!
//! A single error enum covers the relational store, the search backends and
//! input validation, so that session commits and search reads surface one
//! error type to callers.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Liftlog library.
#[derive(Debug, Error)]
pub enum LiftlogError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    // Search backend errors
    #[error("Search backend error in {namespace}: {message}")]
    Search {
        namespace: String,
        message: String,
        status_code: Option<u16>,
    },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Entity errors
    #[error("{table} not found: {id}")]
    EntityNotFound { table: String, id: i64 },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Liftlog operations.
pub type Result<T> = std::result::Result<T, LiftlogError>;

impl From<std::io::Error> for LiftlogError {
    fn from(err: std::io::Error) -> Self {
        LiftlogError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for LiftlogError {
    fn from(err: serde_json::Error) -> Self {
        LiftlogError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for LiftlogError {
    fn from(err: rusqlite::Error) -> Self {
        LiftlogError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for LiftlogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LiftlogError::Timeout(crate::config::SearchConfig::REQUEST_TIMEOUT)
        } else {
            LiftlogError::Network {
                message: err.to_string(),
                cause: err.url().map(|u| u.to_string()),
            }
        }
    }
}

impl LiftlogError {
    /// Create a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LiftlogError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a search backend error scoped to a namespace.
    pub fn search(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        LiftlogError::Search {
            namespace: namespace.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Error raised when the shared connection mutex is poisoned.
    pub(crate) fn lock_poisoned() -> Self {
        LiftlogError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        }
    }

    /// Check if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LiftlogError::Network { .. } | LiftlogError::Timeout(_) => true,
            LiftlogError::Search { status_code, .. } => {
                matches!(status_code, Some(408 | 429 | 500 | 502 | 503 | 504))
            }
            _ => false,
        }
    }

    /// Whether the error originated in the search backend rather than the
    /// relational store.
    pub fn is_search_backend(&self) -> bool {
        matches!(
            self,
            LiftlogError::Network { .. } | LiftlogError::Timeout(_) | LiftlogError::Search { .. }
        )
    }
}
