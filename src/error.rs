//! Error types for the memory engine.
//!
//! Validation and not-found errors are caller mistakes and are reported back as
//! tool-level errors. Everything else is a storage or runtime failure.

use thiserror::Error;

/// Result type alias using [`MemoryError`].
pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Error, Debug)]
pub enum MemoryError {
    /// Bad namespace, scope, empty content, unsupported promotion target.
    #[error("{0}")]
    Validation(String),

    #[error("memory {0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// `true` for errors caused by the caller's input rather than the store.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}
