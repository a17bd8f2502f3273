//! Interception of suspension and resumption events
//!
//! A continuation may carry a [`ContinuationInterceptor`]. When it does,
//! [`capture_interceptable`] lets the interceptor wrap the continuation
//! before the body runs and route the body's synchronous outcome: the
//! interceptor either claims it (and delivers it later through the wrapped
//! continuation) or declines and lets it propagate as usual.

use crate::capture::capture;
use crate::continuation::Continuation;
use crate::error::Fault;
use crate::suspend::Suspend;

/// Decision of an interceptor about a synchronous outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intercepted<V> {
    /// The interceptor took the outcome and will deliver it through the
    /// wrapped continuation
    Claimed,
    /// The interceptor handed the outcome back; it propagates normally
    Declined(V),
}

impl<V> Intercepted<V> {
    /// Check if the interceptor took the outcome
    #[inline]
    pub fn is_claimed(&self) -> bool {
        matches!(self, Intercepted::Claimed)
    }
}

/// Capability attached to a continuation that observes or redirects its
/// suspension and resumption.
///
/// Implementations may schedule freely inside any callback (post to another
/// thread, queue for a later turn). A fault returned from a callback
/// propagates to the caller of [`capture_interceptable`] as is.
///
/// Every callback defaults to pass-through, so an observer only overrides
/// the events it cares about.
pub trait ContinuationInterceptor<T>: Send + Sync {
    /// Wrap the raw continuation before the body receives it
    fn intercept_suspend(&self, continuation: Continuation<T>) -> Result<Continuation<T>, Fault> {
        Ok(continuation)
    }

    /// Offered the body's immediate result.
    ///
    /// Returning `Claimed` is a promise that `continuation` has been or will
    /// be resumed with the value (or an equivalent).
    fn intercept_resume(
        &self,
        value: T,
        continuation: &Continuation<T>,
    ) -> Result<Intercepted<T>, Fault> {
        let _ = continuation;
        Ok(Intercepted::Declined(value))
    }

    /// Offered a fault that escaped the body.
    ///
    /// Returning `Claimed` absorbs the fault; the interceptor is then
    /// responsible for completing `continuation`.
    fn intercept_fault(
        &self,
        fault: Fault,
        continuation: &Continuation<T>,
    ) -> Result<Intercepted<Fault>, Fault> {
        let _ = continuation;
        Ok(Intercepted::Declined(fault))
    }
}

/// [`capture`] with interception.
///
/// Without an interceptor on `continuation` this is exactly [`capture`].
/// Otherwise the body runs with the interceptor's wrapped continuation and:
/// - `Suspended` is reported as is; the interceptor completes the wrapped
///   continuation on its own schedule
/// - `Ready(v)` is offered to the interceptor; a claim reports `Suspended`
///   upward, a decline reports `Ready(v)`
/// - a body fault is offered to the interceptor; a claim reports
///   `Suspended`, a decline propagates the fault unchanged
///
/// A body that resumes its continuation and also returns a value breaks the
/// one-shot contract; on the decline path this fails with `DoubleDelivery`
/// after the body's resumption has been delivered.
pub fn capture_interceptable<T, F>(
    continuation: Continuation<T>,
    body: F,
) -> Result<Suspend<T>, Fault>
where
    F: FnOnce(Continuation<T>) -> Result<Suspend<T>, Fault>,
{
    capture(continuation, |raw| {
        let Some(interceptor) = raw.interceptor().cloned() else {
            return body(raw);
        };

        let wrapped = interceptor.intercept_suspend(raw)?;
        match body(wrapped.clone()) {
            Ok(Suspend::Suspended) => Ok(Suspend::Suspended),
            Ok(Suspend::Ready(value)) => match interceptor.intercept_resume(value, &wrapped)? {
                Intercepted::Claimed => Ok(Suspend::Suspended),
                Intercepted::Declined(value) => {
                    wrapped.seal()?;
                    Ok(Suspend::Ready(value))
                }
            },
            Err(fault) => match interceptor.intercept_fault(fault, &wrapped)? {
                Intercepted::Claimed => Ok(Suspend::Suspended),
                Intercepted::Declined(fault) => Err(fault),
            },
        }
    })
}
