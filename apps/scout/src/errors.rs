use thiserror::Error;

/// Errors raised by the dedup/history store.
///
/// Duplicate inserts are never surfaced here: the store absorbs them as no-ops.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while talking to a job source.
///
/// Fetchers never return these to callers; they decide per variant whether to
/// retry, skip the page, or stop with a partial result.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited by source")]
    RateLimited,

    #[error("Source returned status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Timeouts, connection failures and 5xx responses are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::Status(status) => *status >= 500,
            FetchError::RateLimited | FetchError::Malformed(_) => false,
        }
    }
}
