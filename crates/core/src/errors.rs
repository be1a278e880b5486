//! Error types shared by every adpulse crate.

use thiserror::Error;

use crate::sync::RetryClass;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Upstream API error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed call to the upstream advertising API, already classified for retry.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub status: Option<u16>,
    pub retry_class: RetryClass,
    pub message: String,
    pub request_id: Option<String>,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// True for upstream 401/403 style failures that must never be retried.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Upstream(UpstreamError {
                retry_class: RetryClass::ReauthRequired,
                ..
            })
        )
    }
}
