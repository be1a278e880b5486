//! Error types for the ads API crate.

use adpulse_core::errors::{Error, UpstreamError};
use adpulse_core::sync::{classify_http_status, RetryClass};
use thiserror::Error;

/// Result type alias for ads API operations.
pub type Result<T> = std::result::Result<T, AdsApiError>;

#[derive(Debug, Error)]
pub enum AdsApiError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the API.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    /// The local daily request budget is spent.
    #[error("Daily request quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AdsApiError {
    pub fn api(status: u16, message: impl Into<String>, request_id: Option<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            request_id,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Api { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => RetryClass::Retryable,
            Self::Json(_) | Self::InvalidRequest(_) | Self::QuotaExhausted(_) => {
                RetryClass::Permanent
            }
            Self::Auth(_) => RetryClass::ReauthRequired,
        }
    }
}

impl From<AdsApiError> for Error {
    fn from(err: AdsApiError) -> Self {
        Error::Upstream(UpstreamError {
            status: err.status_code(),
            retry_class: err.retry_class(),
            request_id: err.request_id().map(str::to_string),
            message: err.to_string(),
        })
    }
}
