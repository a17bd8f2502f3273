//! Completion sink for the owner of a suspended computation

use crate::continuation::{Completion, Continuation, ContinuationId};
use crate::error::Fault;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

enum Slot<T> {
    Empty,
    Filled(Result<T, Fault>),
    Taken,
    Abandoned,
}

struct Inner<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T: Send> Completion<T> for Inner<T> {
    fn complete(&self, outcome: Result<T, Fault>) {
        let failed = outcome.is_err();
        let mut slot = self.slot.lock();
        *slot = Slot::Filled(outcome);
        tracing::trace!(failed, "deferred outcome delivered");
        self.ready.notify_all();
    }

    fn abandon(&self) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Empty) {
            *slot = Slot::Abandoned;
            tracing::trace!("deferred continuation abandoned");
            self.ready.notify_all();
        }
    }
}

/// Receiving half of a [`deferred`] pair
pub struct Deferred<T> {
    id: ContinuationId,
    inner: Arc<Inner<T>>,
}

/// Create a continuation together with the sink that receives its outcome.
///
/// The continuation goes to the suspending body; the [`Deferred`] stays with
/// whoever awaits the result, possibly on another thread.
pub fn deferred<T: Send + 'static>() -> (Continuation<T>, Deferred<T>) {
    let inner = Arc::new(Inner {
        slot: Mutex::new(Slot::Empty),
        ready: Condvar::new(),
    });
    let continuation = Continuation::new(inner.clone());
    let id = continuation.id();
    (continuation, Deferred { id, inner })
}

impl<T> Deferred<T> {
    /// ID of the continuation feeding this sink
    pub fn id(&self) -> ContinuationId {
        self.id
    }

    /// Check if the outcome has arrived (and not been taken yet)
    pub fn is_complete(&self) -> bool {
        matches!(*self.inner.slot.lock(), Slot::Filled(_))
    }

    /// Check if the continuation was sealed or dropped without an outcome
    pub fn is_abandoned(&self) -> bool {
        matches!(*self.inner.slot.lock(), Slot::Abandoned)
    }

    /// Take the outcome without blocking
    pub fn try_take(&self) -> Option<Result<T, Fault>> {
        let mut slot = self.inner.slot.lock();
        take_filled(&mut slot)
    }

    /// Block until the outcome arrives.
    ///
    /// Fails straight away if the outcome was already taken with
    /// [`try_take`](Self::try_take), or once the continuation is abandoned
    /// (its capture returned an immediate result, or every handle was
    /// dropped without resuming).
    pub fn wait(self) -> Result<T, Fault> {
        let mut slot = self.inner.slot.lock();
        while matches!(*slot, Slot::Empty) {
            self.inner.ready.wait(&mut slot);
        }
        self.settled(&mut slot)
    }

    /// Block until the outcome arrives, with a timeout.
    ///
    /// Returns `None` if nothing arrived in time. An abandoned continuation
    /// returns an error at once, like [`wait`](Self::wait).
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, Fault>> {
        let mut slot = self.inner.slot.lock();
        if matches!(*slot, Slot::Empty) {
            self.inner.ready.wait_for(&mut slot, timeout);
        }
        if matches!(*slot, Slot::Empty) {
            tracing::debug!(continuation = %self.id, ?timeout, "deferred wait timed out");
            return None;
        }
        Some(self.settled(&mut slot))
    }

    fn settled(&self, slot: &mut Slot<T>) -> Result<T, Fault> {
        if matches!(*slot, Slot::Abandoned) {
            return Err(anyhow::anyhow!("continuation {} was abandoned", self.id));
        }
        take_filled(slot).unwrap_or_else(|| {
            Err(anyhow::anyhow!(
                "outcome of continuation {} was already taken",
                self.id
            ))
        })
    }
}

fn take_filled<T>(slot: &mut Slot<T>) -> Option<Result<T, Fault>> {
    match std::mem::replace(slot, Slot::Taken) {
        Slot::Filled(outcome) => Some(outcome),
        other => {
            *slot = other;
            None
        }
    }
}
