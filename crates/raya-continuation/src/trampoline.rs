//! Trampoline interceptor
//!
//! Defers every resumption to a later turn instead of running it inside the
//! frame that produced it. Resumptions go onto a queue, and the owner
//! drains the queue from its own loop with [`Trampoline::run_pending`], or
//! blocks for resumptions coming from other threads with
//! [`Trampoline::run_next_timeout`].

use crate::continuation::Continuation;
use crate::error::Fault;
use crate::intercept::{ContinuationInterceptor, Intercepted};
use crossbeam::channel::{self, Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Job = Box<dyn FnOnce() + Send>;

/// Queue limits for a [`Trampoline`]
///
/// The cap applies to claims of synchronous results and faults. A wrapped
/// continuation resumed from elsewhere is always queued, since dropping it
/// would lose the outcome.
#[derive(Debug, Clone, Default)]
pub struct TrampolineLimits {
    /// Queued resumptions at which synchronous results stop being claimed
    /// (None = unlimited)
    pub max_pending: Option<usize>,
}

impl TrampolineLimits {
    /// Limits with a cap on queued resumptions
    pub fn bounded(max_pending: usize) -> Self {
        Self {
            max_pending: Some(max_pending),
        }
    }
}

/// Sending side shared by the trampoline and every continuation it wrapped
#[derive(Clone)]
struct Queue {
    sender: Sender<Job>,
    pending: Arc<AtomicUsize>,
}

impl Queue {
    fn push(&self, job: Job) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!("trampoline dropped; resumption lost");
        }
    }
}

/// Slot held in the pending count while a claim queues its job
struct Reservation<'a> {
    pending: &'a AtomicUsize,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Interceptor that turns resumptions into queued jobs
pub struct Trampoline {
    queue: Queue,
    receiver: Receiver<Job>,
    limits: TrampolineLimits,
}

impl Trampoline {
    /// Create a trampoline with no queue limit
    pub fn new() -> Self {
        Self::with_limits(TrampolineLimits::default())
    }

    /// Create a trampoline with queue limits
    pub fn with_limits(limits: TrampolineLimits) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            queue: Queue {
                sender,
                pending: Arc::new(AtomicUsize::new(0)),
            },
            receiver,
            limits,
        }
    }

    /// Attach this trampoline as the interceptor of `continuation`
    pub fn attach<T: Send + 'static>(
        self: &Arc<Self>,
        continuation: Continuation<T>,
    ) -> Continuation<T> {
        continuation.with_interceptor(self.clone())
    }

    /// Get the configured limits
    pub fn limits(&self) -> &TrampolineLimits {
        &self.limits
    }

    /// Number of queued resumptions
    pub fn pending(&self) -> usize {
        self.queue.pending.load(Ordering::Acquire)
    }

    /// Reserve room for one claimed resumption.
    ///
    /// The slot is counted until the reservation drops, so concurrent claims
    /// cannot overshoot `max_pending`. Returns `None` when the queue is full.
    fn reserve(&self) -> Option<Reservation<'_>> {
        let pending = &*self.queue.pending;
        let max = self.limits.max_pending.unwrap_or(usize::MAX);
        pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .ok()
            .map(|_| Reservation { pending })
    }

    /// Run one queued resumption, if any
    pub fn run_once(&self) -> bool {
        match self.receiver.try_recv() {
            Ok(job) => {
                self.run(job);
                true
            }
            Err(_) => false,
        }
    }

    /// Run queued resumptions until the queue is empty.
    ///
    /// Resumptions queued by the jobs themselves run in the same call.
    /// Returns the number of jobs run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_once() {
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "trampoline drained");
        }
        ran
    }

    /// Wait up to `timeout` for a resumption and run it
    pub fn run_next_timeout(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                self.run(job);
                true
            }
            Err(_) => false,
        }
    }

    fn run(&self, job: Job) {
        self.queue.pending.fetch_sub(1, Ordering::AcqRel);
        job();
    }
}

impl Default for Trampoline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trampoline")
            .field("pending", &self.pending())
            .field("limits", &self.limits)
            .finish()
    }
}

impl<T: Send + 'static> ContinuationInterceptor<T> for Trampoline {
    fn intercept_suspend(&self, continuation: Continuation<T>) -> Result<Continuation<T>, Fault> {
        let queue = self.queue.clone();
        // The queued job must not hold the trampoline through the interceptor
        // field, or the trampoline and its queue would keep each other alive.
        let continuation = continuation.without_interceptor();
        Ok(Continuation::from_fn(move |outcome| {
            tracing::trace!(continuation = %continuation.id(), "resumption deferred");
            queue.push(Box::new(move || {
                if let Err(err) = continuation.resume_with(outcome) {
                    tracing::warn!(%err, "deferred resumption rejected");
                }
            }));
        }))
    }

    /// Claims the value by resuming the wrapped continuation, which queues it.
    ///
    /// If the body already resumed the wrapped continuation before returning
    /// a value, this fails with `AlreadyResumed`; the body's own resumption
    /// stays queued and is the one delivered.
    fn intercept_resume(
        &self,
        value: T,
        continuation: &Continuation<T>,
    ) -> Result<Intercepted<T>, Fault> {
        let Some(_slot) = self.reserve() else {
            tracing::debug!(
                continuation = %continuation.id(),
                pending = self.pending(),
                "trampoline full; returning immediately"
            );
            return Ok(Intercepted::Declined(value));
        };
        continuation.resume(value)?;
        Ok(Intercepted::Claimed)
    }

    fn intercept_fault(
        &self,
        fault: Fault,
        continuation: &Continuation<T>,
    ) -> Result<Intercepted<Fault>, Fault> {
        let Some(_slot) = self.reserve() else {
            tracing::debug!(
                continuation = %continuation.id(),
                pending = self.pending(),
                "trampoline full; propagating fault"
            );
            return Ok(Intercepted::Declined(fault));
        };
        continuation.resume_with_fault(fault)?;
        Ok(Intercepted::Claimed)
    }
}
