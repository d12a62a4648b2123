//! Error taxonomy: setup failures are fatal, fetch failures are classified so the
//! fetcher knows whether to back off, retry, or give up on a (country, phase) pair.

use std::time::Duration;
use thiserror::Error;

/// Setup and lookup errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("unknown country `{0}` (no subreddit or keyword set configured)")]
    UnknownCountry(String),
    #[error("unknown phase `{0}` (expected pre, during or post)")]
    UnknownPhase(String),
    #[error("authentication with the Reddit API failed: {0}")]
    Auth(String),
}

/// Failure of a single listing page request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 429. `retry_after` is the server hint when one was sent.
    #[error("rate limited by upstream (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    /// Network error, 5xx, or a body that could not be decoded.
    #[error("transient upstream failure: {0}")]
    Transient(String),
    /// Anything a retry cannot fix (403, 404, banned subreddit, ...).
    #[error("upstream rejected request: {0}")]
    Fatal(String),
}
