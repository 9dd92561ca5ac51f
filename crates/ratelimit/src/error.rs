use chrono::{DateTime, Utc};
use thiserror::Error;

use csvchat_state::StateError;

/// Errors returned by a [`RateLimiter`](crate::RateLimiter).
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// The caller used up its quota for the current window.
    #[error("too many messages: limit of {limit} per day reached, resets at {reset}")]
    QuotaExceeded { limit: u64, reset: DateTime<Utc> },

    /// The counter could not be read or written.
    #[error(transparent)]
    Store(#[from] StateError),
}

impl RateLimitError {
    /// Whether this error means the caller should back off until `reset`.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
