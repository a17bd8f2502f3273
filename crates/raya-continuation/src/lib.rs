//! Raya Continuation - suspension hooks for generated state machines
//!
//! The compiler lowers every `async` function into a state machine. At each
//! suspension point the state machine calls into this crate, handing over a
//! [`Continuation`] for "the rest of the function".
//!
//! # Capture
//!
//! [`capture`] runs a body once with the continuation. The body either
//! answers right away with [`Suspend::Ready`] or returns
//! [`Suspend::Suspended`] and arranges for the continuation to be resumed
//! later, possibly from another thread.
//!
//! ```ignore
//! let (cont, result) = raya_continuation::deferred::<u32>();
//! let outcome = capture(cont, |c| {
//!     reactor.on_readable(fd, move |n| { let _ = c.resume(n); });
//!     Ok(Suspend::Suspended)
//! })?;
//! ```
//!
//! # Interception
//!
//! A continuation may carry a [`ContinuationInterceptor`]. With
//! [`capture_interceptable`] the interceptor wraps the continuation before
//! the body sees it and may claim synchronous results and faults, delivering
//! them through the wrapped continuation instead. [`Trampoline`] is the
//! stock interceptor: it pushes every resumption onto a queue drained by
//! its owner.
//!
//! # Resumption contract
//!
//! A continuation is resumed at most once. A second resume fails with
//! [`ContinuationError::AlreadyResumed`], and resuming a continuation whose
//! capture already returned a value fails with
//! [`ContinuationError::ReturnedImmediately`].

#![warn(missing_docs)]

mod capture;
mod continuation;
mod deferred;
mod error;
mod intercept;
mod safe;
mod suspend;
mod trampoline;

pub use capture::capture;
pub use continuation::{Completion, Continuation, ContinuationId, ResumeState};
pub use deferred::{deferred, Deferred};
pub use error::{ContinuationError, Fault, ResumeResult};
pub use intercept::{capture_interceptable, ContinuationInterceptor, Intercepted};
pub use safe::capture_safe;
pub use suspend::Suspend;
pub use trampoline::{Trampoline, TrampolineLimits};
