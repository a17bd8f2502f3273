//! Capture that tolerates synchronous resumption
//!
//! With [`capture`](crate::capture) a body that resumes its continuation
//! before returning re-enters the caller's state machine from inside the
//! body. [`capture_safe`] hands the body a guarded continuation instead: a
//! resume that happens before the body returns becomes the immediate
//! result, and only a resume after that is forwarded.

use crate::continuation::{Completion, Continuation};
use crate::error::Fault;
use crate::intercept::capture_interceptable;
use crate::suspend::Suspend;
use parking_lot::Mutex;
use std::sync::Arc;

enum SafeState<T> {
    /// Body still running, nothing delivered
    Undecided,
    /// Resumed while the body was running
    Resumed(Result<T, Fault>),
    /// Body returned without resuming; resumes are forwarded
    Suspended,
    /// Outcome already reported to the caller (or the body faulted)
    Decided,
}

struct SafeSlot<T> {
    state: Mutex<SafeState<T>>,
    delegate: Continuation<T>,
}

impl<T: Send> SafeSlot<T> {
    fn decide(&self) -> Result<Suspend<T>, Fault> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, SafeState::Decided) {
            SafeState::Undecided => {
                *state = SafeState::Suspended;
                Ok(Suspend::Suspended)
            }
            SafeState::Resumed(outcome) => outcome.map(Suspend::Ready),
            SafeState::Suspended => {
                *state = SafeState::Suspended;
                Ok(Suspend::Suspended)
            }
            SafeState::Decided => Ok(Suspend::Suspended),
        }
    }

    fn abandon(&self) {
        *self.state.lock() = SafeState::Decided;
    }
}

impl<T: Send> Completion<T> for SafeSlot<T> {
    fn complete(&self, outcome: Result<T, Fault>) {
        let mut state = self.state.lock();
        if matches!(*state, SafeState::Undecided) {
            *state = SafeState::Resumed(outcome);
            return;
        }
        let forward = matches!(*state, SafeState::Suspended);
        drop(state);

        if forward {
            if let Err(err) = self.delegate.resume_with(outcome) {
                tracing::warn!(%err, "forwarded resumption rejected");
            }
        } else {
            tracing::debug!(
                continuation = %self.delegate.id(),
                "resumption after capture was decided; dropped"
            );
        }
    }
}

/// Run `body` with a continuation it may resume at any time, including
/// before it returns.
///
/// - resumed during the body: the value is reported as `Ready` (a fault is
///   returned as `Err`)
/// - not resumed yet: `Suspended` is reported and the eventual resume is
///   forwarded to `continuation`
/// - body fault: the fault propagates and any later resume is dropped
///
/// Runs through [`capture_interceptable`], so an interceptor on
/// `continuation` sees synchronous outcomes and may defer them.
pub fn capture_safe<T, F>(continuation: Continuation<T>, body: F) -> Result<Suspend<T>, Fault>
where
    T: Send + 'static,
    F: FnOnce(Continuation<T>) -> Result<(), Fault>,
{
    capture_interceptable(continuation, |delegate| {
        let slot = Arc::new(SafeSlot {
            state: Mutex::new(SafeState::Undecided),
            delegate,
        });
        if let Err(fault) = body(Continuation::new(slot.clone())) {
            slot.abandon();
            return Err(fault);
        }
        slot.decide()
    })
}
