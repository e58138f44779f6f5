//! Error types for the Laurel achievement engine
//!
//! This module provides structured error handling using thiserror, with
//! anyhow reserved for the binary boundary.

use thiserror::Error;

/// Main error type for Laurel operations
#[derive(Error, Debug)]
pub enum LaurelError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Concurrent writers kept invalidating the award transaction
    ///
    /// Retryable: criteria stay evaluable against current stats, so the
    /// caller's event pipeline can simply re-run the trigger later.
    #[error("Award transaction conflicted {0} times; giving up")]
    ConflictRetriesExhausted(u32),

    /// Achievement catalog failed startup validation
    #[error("Catalog integrity error: {0}")]
    Catalog(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl LaurelError {
    /// Whether the caller may retry the whole operation and expect success
    pub fn is_retryable(&self) -> bool {
        matches!(self, LaurelError::ConflictRetriesExhausted(_))
    }

    /// Transient lock contention reported by the storage backend
    pub fn is_contention(&self) -> bool {
        match self {
            LaurelError::Database(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("busy") || msg.contains("locked")
            }
            _ => false,
        }
    }
}

/// Result type alias for Laurel operations
pub type Result<T> = std::result::Result<T, LaurelError>;

impl From<libsql::Error> for LaurelError {
    fn from(err: libsql::Error) -> Self {
        LaurelError::Database(err.to_string())
    }
}

/// Convert anyhow::Error to LaurelError
impl From<anyhow::Error> for LaurelError {
    fn from(err: anyhow::Error) -> Self {
        LaurelError::Other(err.to_string())
    }
}
