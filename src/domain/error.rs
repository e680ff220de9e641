//! Domain-level error types for prompt-sync.
//!
//! All errors are typed with `thiserror` and carry a human-readable message
//! that is safe to show to the user and to persist as the sync error.

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Remote backend not configured, or the config file is unusable.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Notion API or network failure. The upstream message is kept verbatim.
    #[error("{message}")]
    Remote {
        message: String,
        status: Option<u16>,
    },

    /// Malformed import payload or invalid prompt input.
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The record store rejected or failed an operation.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single remote page could not be mapped to a prompt.
    #[error("Conversion error: {message}")]
    Conversion { message: String },

    /// No prompt with the given id.
    #[error("Prompt not found: {id}")]
    NotFound { id: String },

    /// Another sync run is recorded as still in progress.
    #[error("A sync is already in progress")]
    SyncInProgress,

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a storage error from a rusqlite error.
    pub fn storage(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a storage error for a value that could not be decoded.
    pub fn corrupt_record(key: &str, err: serde_json::Error) -> Self {
        Self::Storage {
            message: format!("Stored value for '{key}' is malformed: {err}"),
            source: Some(Box::new(err)),
        }
    }

    /// Create a remote error from a transport failure.
    pub fn remote(err: &reqwest::Error) -> Self {
        Self::Remote {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Error raised when a sync is attempted without Notion credentials.
    #[must_use]
    pub fn not_configured() -> Self {
        Self::Config {
            message: "Notion is not configured".into(),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
