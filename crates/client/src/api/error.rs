//! REST client error types.

use std::sync::Arc;

/// Errors from the backend API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request parameters failed validation before sending.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Base URL or endpoint could not be turned into a URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Token missing, expired or revoked (HTTP 401).
    #[error("unauthorized: session token rejected")]
    Unauthorized,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response body did not match the page envelope.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ApiError::Timeout } else { ApiError::Network(Arc::new(err)) }
    }
}

impl ApiError {
    /// Short text for the one-shot failure notification.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ApiError::Timeout => "The request timed out. Please try again.".to_string(),
            ApiError::InvalidRequest(msg) => msg.clone(),
            _ => "Failed to load. Please try again later.".to_string(),
        }
    }
}

impl From<ApiError> for bage_core::Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => bage_core::Error::Unauthorized("session token rejected".to_string()),
            ApiError::InvalidRequest(msg) | ApiError::InvalidUrl(msg) => bage_core::Error::InvalidInput(msg),
            other => bage_core::Error::FetchFailed(other.to_string()),
        }
    }
}
