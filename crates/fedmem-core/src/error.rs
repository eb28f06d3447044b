//! Error taxonomy for the federated memory service.
//!
//! Kinds, not type names (spec §7): callers match on `FedMemError` variants,
//! never on the underlying transport or storage error that caused them.

use std::time::Duration;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FedMemError>;

/// The full error taxonomy. Transient kinds (`EmbeddingUnavailable`,
/// `StoreUnavailable`, `NotifierUnavailable`) are retried by the pipeline
/// with bounded exponential backoff; everything else propagates unchanged.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FedMemError {
    /// Caller gave malformed or missing required input.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// The requested tenant, memory, relationship, or module is unknown.
    #[error("not found: {0}")]
    NotFound(String),

    /// Token missing, malformed, unknown, or expired. Deliberately rendered
    /// identically to `NotFound` on public surfaces (spec §7).
    #[error("unauthorized")]
    Unauthorized,

    /// Uniqueness constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The embedding provider could not be reached or failed.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The vector store could not be reached or failed.
    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// The change notifier could not publish.
    #[error("notifier unavailable: {0}")]
    NotifierUnavailable(String),

    /// Caller-supplied deadline elapsed before the operation completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Internal invariant violated; should never be returned for well-formed input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FedMemError {
    /// Transient kinds are worth retrying; everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FedMemError::EmbeddingUnavailable(_)
                | FedMemError::StoreUnavailable(_)
                | FedMemError::NotifierUnavailable(_)
        )
    }

    /// Render `Unauthorized` as `NotFound` for public-facing surfaces, per
    /// spec §7 ("deliberately indistinguishable ... to avoid token enumeration").
    pub fn to_public(self) -> FedMemError {
        match self {
            FedMemError::Unauthorized => FedMemError::NotFound("resource".to_string()),
            other => other,
        }
    }
}

impl From<rusqlite::Error> for FedMemError {
    fn from(e: rusqlite::Error) -> Self {
        FedMemError::StoreUnavailable(e.to_string())
    }
}

/// Bounded exponential backoff, shared by the write pipeline's compensating
/// retries and the reconciliation job. `attempt` is zero-based.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let factor = 1u64.checked_shl(attempt.min(20)).unwrap_or(u64::MAX);
    base.checked_mul(factor as u32).unwrap_or(cap).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_renders_as_not_found_on_public_surface() {
        let e = FedMemError::Unauthorized.to_public();
        assert!(matches!(e, FedMemError::NotFound(_)));
    }

    #[test]
    fn transient_kinds_are_flagged() {
        assert!(FedMemError::StoreUnavailable("x".into()).is_transient());
        assert!(!FedMemError::Invalid("x".into()).is_transient());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let base = Duration::from_millis(100);
        let cap = Duration::from_secs(30);
        assert_eq!(backoff_delay(0, base, cap), Duration::from_millis(100));
        assert_eq!(backoff_delay(1, base, cap), Duration::from_millis(200));
        assert_eq!(backoff_delay(10, base, cap), cap);
    }
}
