use thiserror::Error;

use crate::store::StoreError;

/// Failure taxonomy shared by every engine entry point.
///
/// `InsufficientData` and `InvalidParameter` are terminal for the call:
/// the caller gets an explicit signal instead of a zero/empty artifact that
/// would be indistinguishable from "fully mastered" or "perfectly stable".
/// `Upstream` wraps a failed or timed-out attempt-history read and is the
/// only retryable class.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("attempt store unavailable: {0}")]
    Upstream(#[from] StoreError),
}

impl EngineError {
    /// Callers retry `Upstream` with backoff; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Upstream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_upstream_is_retryable() {
        assert!(!EngineError::InsufficientData("x".into()).is_retryable());
        assert!(!EngineError::InvalidParameter("x".into()).is_retryable());
        assert!(EngineError::Upstream(StoreError::Timeout(5000)).is_retryable());
        assert!(EngineError::Upstream(StoreError::Unavailable("down".into())).is_retryable());
    }
}
