//! Unified error types for the bage client core.

use tokio_rusqlite::rusqlite;

/// Unified error types for cache, view and session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., malformed root margin).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Page number out of sequence or below 1.
    #[error("INVALID_PAGE: {0}")]
    InvalidPage(String),

    /// Append requested for a key that has no cached entry.
    #[error("CACHE_MISS: {0}")]
    MissingEntry(String),

    /// Session storage operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Storage(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Remote page source failed.
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),

    /// Request was rejected because the session token is no longer valid.
    #[error("UNAUTHORIZED: {0}")]
    Unauthorized(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Storage(tokio_rusqlite::Error::Close(c)),
            _ => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Storage(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(tokio_rusqlite::Error::Error(err))
    }
}

impl Error {
    /// Whether re-issuing the same operation may succeed.
    ///
    /// Fetch failures leave cache state untouched, so they are always safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::FetchFailed(_) | Error::Storage(_))
    }
}
