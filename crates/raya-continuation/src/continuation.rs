//! One-shot continuation handles
//!
//! A [`Continuation`] stands for "the rest of a computation" at a suspension
//! point. The surrounding runtime supplies the [`Completion`] target that
//! actually carries the computation forward; the handle only enforces that the
//! target receives at most one outcome.
//!
//! Handles are cheap to clone. All clones share the same resumption state, so
//! a continuation stored by a body and the copy kept by an interceptor still
//! resume exactly once between them.

use crate::error::{ContinuationError, Fault, ResumeResult};
use crate::intercept::ContinuationInterceptor;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Unique identifier for a Continuation
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContinuationId(u64);

static NEXT_CONTINUATION_ID: AtomicU64 = AtomicU64::new(1);

impl ContinuationId {
    /// Generate a new unique ContinuationId
    pub fn new() -> Self {
        ContinuationId(NEXT_CONTINUATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Create a ContinuationId from a u64 value
    pub fn from_u64(id: u64) -> Self {
        ContinuationId(id)
    }
}

impl Default for ContinuationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContinuationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receiver of a suspended computation's outcome.
///
/// Implemented by whatever drives the generated state machine forward. The
/// owning [`Continuation`] guarantees `complete` is called at most once.
pub trait Completion<T>: Send + Sync {
    /// Deliver the outcome of the suspended computation
    fn complete(&self, outcome: Result<T, Fault>);

    /// No outcome will ever be delivered.
    ///
    /// Called once, instead of `complete`, when the continuation is sealed by
    /// an immediate result or its last handle is dropped while still pending.
    fn abandon(&self) {}
}

impl<T, C: Completion<T> + ?Sized> Completion<T> for Arc<C> {
    fn complete(&self, outcome: Result<T, Fault>) {
        (**self).complete(outcome)
    }

    fn abandon(&self) {
        (**self).abandon()
    }
}

/// Adapter turning a one-shot closure into a [`Completion`]
struct FnCompletion<F> {
    f: Mutex<Option<F>>,
}

impl<T, F> Completion<T> for FnCompletion<F>
where
    F: FnOnce(Result<T, Fault>) + Send,
{
    fn complete(&self, outcome: Result<T, Fault>) {
        let f = self.f.lock().take();
        if let Some(f) = f {
            f(outcome);
        }
    }

    fn abandon(&self) {
        let f = self.f.lock().take();
        drop(f);
    }
}

/// Resumption state of a continuation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResumeState {
    /// Not yet resumed; the outcome is still owed
    Pending,
    /// An outcome has been delivered to the target
    Resumed,
    /// The capture returned an immediate result; resuming is a violation
    Sealed,
}

const PENDING: u8 = 0;
const RESUMED: u8 = 1;
const SEALED: u8 = 2;

impl ResumeState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            PENDING => ResumeState::Pending,
            RESUMED => ResumeState::Resumed,
            _ => ResumeState::Sealed,
        }
    }
}

struct Shared<T> {
    id: ContinuationId,
    state: AtomicU8,
    target: Box<dyn Completion<T>>,
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == PENDING {
            self.target.abandon();
        }
    }
}

/// Resumable handle for the remainder of a computation
pub struct Continuation<T> {
    shared: Arc<Shared<T>>,
    interceptor: Option<Arc<dyn ContinuationInterceptor<T>>>,
}

impl<T> Continuation<T> {
    /// Create a continuation that delivers its outcome to `target`
    pub fn new(target: impl Completion<T> + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: ContinuationId::new(),
                state: AtomicU8::new(PENDING),
                target: Box::new(target),
            }),
            interceptor: None,
        }
    }

    /// Create a continuation that hands its outcome to a closure
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(Result<T, Fault>) + Send + 'static,
    {
        Self::new(FnCompletion {
            f: Mutex::new(Some(f)),
        })
    }

    /// A handle to the same continuation without its interceptor.
    ///
    /// Resuming it reaches the target directly. Interceptors keep this form
    /// of the raw continuation so they do not hold a reference to themselves.
    pub fn without_interceptor(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            interceptor: None,
        }
    }

    /// Attach an interceptor capability to this handle
    pub fn with_interceptor(mut self, interceptor: Arc<dyn ContinuationInterceptor<T>>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Get the continuation's unique ID
    pub fn id(&self) -> ContinuationId {
        self.shared.id
    }

    /// Get the interceptor attached at construction, if any
    pub fn interceptor(&self) -> Option<&Arc<dyn ContinuationInterceptor<T>>> {
        self.interceptor.as_ref()
    }

    /// Get the current resumption state
    pub fn state(&self) -> ResumeState {
        ResumeState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Check if the outcome is still owed
    pub fn is_pending(&self) -> bool {
        self.state() == ResumeState::Pending
    }

    /// Resume the computation with a value
    pub fn resume(&self, value: T) -> ResumeResult {
        self.resume_with(Ok(value))
    }

    /// Resume the computation with a fault
    pub fn resume_with_fault(&self, fault: Fault) -> ResumeResult {
        self.resume_with(Err(fault))
    }

    /// Resume the computation with an outcome.
    ///
    /// Only the first call on a pending continuation (across all clones)
    /// reaches the target; every later call fails without delivering.
    pub fn resume_with(&self, outcome: Result<T, Fault>) -> ResumeResult {
        match self.shared.state.compare_exchange(
            PENDING,
            RESUMED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.shared.target.complete(outcome);
                Ok(())
            }
            Err(RESUMED) => Err(ContinuationError::AlreadyResumed(self.id())),
            Err(_) => Err(ContinuationError::ReturnedImmediately(self.id())),
        }
    }

    /// Mark the continuation as answered by an immediate result.
    ///
    /// Idempotent on an already sealed continuation. Fails if the continuation
    /// was resumed, since the outcome would then be delivered twice. The
    /// first seal tells the target it is abandoned.
    pub(crate) fn seal(&self) -> ResumeResult {
        match self.shared.state.compare_exchange(
            PENDING,
            SEALED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.shared.target.abandon();
                Ok(())
            }
            Err(SEALED) => Ok(()),
            Err(_) => Err(ContinuationError::DoubleDelivery(self.id())),
        }
    }
}

impl<T> Clone for Continuation<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            interceptor: self.interceptor.clone(),
        }
    }
}

impl<T> fmt::Debug for Continuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("intercepted", &self.interceptor.is_some())
            .finish()
    }
}
