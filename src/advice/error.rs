//! Error types for the advice pipeline.

use super::join_point::{OperationId, Phase};

/// Boxed error returned by advice callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for advice callbacks.
pub type AdviceResult = std::result::Result<(), BoxError>;

/// An advice callback failed.
///
/// Aborts the remaining advice of the same phase and supersedes any target
/// error that triggered it.
#[derive(Debug, thiserror::Error)]
#[error("{phase} advice of aspect '{aspect}' failed on {operation}: {source}")]
pub struct AdviceError {
    pub aspect: String,
    pub phase: Phase,
    pub operation: OperationId,
    pub source: BoxError,
}

/// Errors surfaced by [`Weaver::invoke`](super::Weaver::invoke).
#[derive(Debug, thiserror::Error)]
pub enum InvokeError<E> {
    /// The wrapped operation failed. Returned unchanged.
    #[error(transparent)]
    Target(E),

    /// An advice callback failed.
    #[error(transparent)]
    Advice(#[from] AdviceError),
}

impl<E> InvokeError<E> {
    /// Returns the target error if the wrapped operation failed.
    pub fn target(&self) -> Option<&E> {
        match self {
            InvokeError::Target(e) => Some(e),
            _ => None,
        }
    }

    /// Consume the error, returning the target error if there is one.
    pub fn into_target(self) -> Option<E> {
        match self {
            InvokeError::Target(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the advice error if a callback failed.
    pub fn advice(&self) -> Option<&AdviceError> {
        match self {
            InvokeError::Advice(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_target(&self) -> bool {
        matches!(self, InvokeError::Target(_))
    }

    pub fn is_advice(&self) -> bool {
        matches!(self, InvokeError::Advice(_))
    }
}
