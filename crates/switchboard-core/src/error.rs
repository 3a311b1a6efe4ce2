use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by a backend adapter for a single attempt
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The attempt did not complete within the per-attempt budget
    #[error("attempt timed out")]
    Timeout,

    /// Credentials were rejected upstream
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Upstream rate limit exhausted
    #[error("rate limit exceeded")]
    RateLimited {
        /// Seconds until the limit resets, if the provider said
        retry_after: Option<u64>,
    },

    /// Upstream returned an error or the transport failed
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The request itself is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// Whether another backend or model is worth trying
    ///
    /// Auth errors are retryable because each backend/model may carry
    /// an independent credential; a malformed request will fail
    /// everywhere, so it is surfaced immediately.
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }

    /// Classification tag for the statistics sink
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout => ErrorKind::Timeout,
            Self::Auth(_) => ErrorKind::Auth,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// Serializable classification of an attempt failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Per-attempt timeout fired
    Timeout,
    /// Credential rejected
    Auth,
    /// Rate limit exhausted
    RateLimited,
    /// Upstream or transport failure
    Upstream,
    /// Malformed request
    InvalidRequest,
}
