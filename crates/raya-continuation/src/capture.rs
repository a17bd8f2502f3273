//! Continuation capture
//!
//! [`capture`] is the hook generated state machines call at a suspension
//! point. The body decides between producing a value now
//! ([`Suspend::Ready`]) and producing it later through the continuation
//! ([`Suspend::Suspended`]).

use crate::continuation::Continuation;
use crate::error::Fault;
use crate::suspend::Suspend;

/// Run `body` once with the continuation of the current suspension point.
///
/// Returns the body's result unchanged. When the body reports `Ready(v)` the
/// continuation is sealed so a later resume fails instead of delivering `v`
/// a second time; if the body already resumed it, the capture fails with
/// [`ContinuationError::DoubleDelivery`](crate::ContinuationError::DoubleDelivery).
pub fn capture<T, F>(continuation: Continuation<T>, body: F) -> Result<Suspend<T>, Fault>
where
    F: FnOnce(Continuation<T>) -> Result<Suspend<T>, Fault>,
{
    let handle = continuation.clone();
    let outcome = body(continuation)?;
    if outcome.is_ready() {
        handle.seal()?;
    }
    Ok(outcome)
}
