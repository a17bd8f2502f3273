//! Error types for continuation resumption

use crate::continuation::ContinuationId;

/// Fault carried by a failed computation.
///
/// Bodies "throw" by returning `Err(fault)`; continuations are resumed with a
/// fault through [`Continuation::resume_with_fault`](crate::Continuation::resume_with_fault).
pub type Fault = anyhow::Error;

/// Result of a resumption attempt
pub type ResumeResult = Result<(), ContinuationError>;

/// Violations of the one-shot resumption contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContinuationError {
    /// `resume*` was called on a continuation that was already resumed
    #[error("continuation {0} was already resumed")]
    AlreadyResumed(ContinuationId),

    /// `resume*` was called after the capture returned an immediate result
    #[error("continuation {0} cannot be resumed: its capture returned an immediate result")]
    ReturnedImmediately(ContinuationId),

    /// The body resumed the continuation and also returned an immediate result
    #[error("continuation {0} was resumed and also returned an immediate result")]
    DoubleDelivery(ContinuationId),
}

impl ContinuationError {
    /// The continuation the violation was reported for
    pub fn continuation_id(&self) -> ContinuationId {
        match *self {
            ContinuationError::AlreadyResumed(id)
            | ContinuationError::ReturnedImmediately(id)
            | ContinuationError::DoubleDelivery(id) => id,
        }
    }
}
