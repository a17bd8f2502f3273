//! End-to-end tests for capture, interception, and resumption

use anyhow::anyhow;
use parking_lot::Mutex;
use raya_continuation::{
    capture, capture_interceptable, capture_safe, deferred, Continuation, ContinuationError,
    ContinuationId, ContinuationInterceptor, Fault, Intercepted, ResumeState, Suspend, Trampoline,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Continuation that counts deliveries and keeps the last value
fn counting<T: Send + 'static>() -> (Continuation<T>, Arc<AtomicUsize>, Arc<Mutex<Option<T>>>) {
    let count = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let (c, l) = (count.clone(), last.clone());
    let cont = Continuation::from_fn(move |outcome: Result<T, Fault>| {
        c.fetch_add(1, Ordering::SeqCst);
        if let Ok(value) = outcome {
            *l.lock() = Some(value);
        }
    });
    (cont, count, last)
}

/// Interceptor that logs every callback and claims synchronous results
/// without delivering them, leaving delivery to the test
#[derive(Default)]
struct Claiming {
    suspends: Mutex<Vec<ContinuationId>>,
    resumes: Mutex<Vec<(i32, ContinuationId)>>,
    faults: AtomicUsize,
    wrapped: Mutex<Option<Continuation<i32>>>,
}

impl ContinuationInterceptor<i32> for Claiming {
    fn intercept_suspend(&self, raw: Continuation<i32>) -> Result<Continuation<i32>, Fault> {
        self.suspends.lock().push(raw.id());
        let wrapped = Continuation::from_fn(move |outcome| {
            let _ = raw.resume_with(outcome);
        });
        *self.wrapped.lock() = Some(wrapped.clone());
        Ok(wrapped)
    }

    fn intercept_resume(
        &self,
        value: i32,
        continuation: &Continuation<i32>,
    ) -> Result<Intercepted<i32>, Fault> {
        self.resumes.lock().push((value, continuation.id()));
        Ok(Intercepted::Claimed)
    }

    fn intercept_fault(
        &self,
        _fault: Fault,
        _continuation: &Continuation<i32>,
    ) -> Result<Intercepted<Fault>, Fault> {
        self.faults.fetch_add(1, Ordering::SeqCst);
        Ok(Intercepted::Claimed)
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_synchronous_value_without_interceptor() {
    let (cont, count, _last) = counting::<i32>();

    let result = capture(cont, |_c| Ok(Suspend::Ready(42))).unwrap();

    assert_eq!(result, Suspend::Ready(42));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_suspended_value_arrives_from_another_thread() {
    let (cont, sink) = deferred::<&'static str>();

    let result = capture(cont, |c| {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(1));
            c.resume("done").unwrap();
        });
        Ok(Suspend::Suspended)
    })
    .unwrap();

    assert_eq!(result, Suspend::Suspended);
    assert_eq!(sink.wait().unwrap(), "done");
}

#[test]
fn test_interceptor_sees_only_suspend_when_body_suspends() {
    let interceptor = Arc::new(Claiming::default());
    let (cont, _count, _last) = counting::<i32>();
    let raw_id = cont.id();
    let mut body_id = None;

    let result = capture_interceptable(cont.with_interceptor(interceptor.clone()), |c| {
        body_id = Some(c.id());
        Ok(Suspend::Suspended)
    })
    .unwrap();

    assert_eq!(result, Suspend::Suspended);
    assert_eq!(*interceptor.suspends.lock(), vec![raw_id]);
    assert_eq!(body_id, interceptor.wrapped.lock().as_ref().map(|c| c.id()));
    assert!(interceptor.resumes.lock().is_empty());
    assert_eq!(interceptor.faults.load(Ordering::SeqCst), 0);
}

#[test]
fn test_claimed_value_is_delivered_once_through_wrapped() {
    let interceptor = Arc::new(Claiming::default());
    let (cont, count, last) = counting::<i32>();

    let cont = cont.with_interceptor(interceptor.clone());
    let result = capture_interceptable(cont, |_c| Ok(Suspend::Ready(7))).unwrap();

    assert_eq!(result, Suspend::Suspended);
    assert_eq!(count.load(Ordering::SeqCst), 0);

    let wrapped = interceptor.wrapped.lock().clone().unwrap();
    assert_eq!(*interceptor.resumes.lock(), vec![(7, wrapped.id())]);

    wrapped.resume(7).unwrap();
    assert_eq!(
        wrapped.resume(7),
        Err(ContinuationError::AlreadyResumed(wrapped.id()))
    );
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(*last.lock(), Some(7));
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_interceptable_matches_capture_without_interceptor() {
    type Body = fn(Continuation<i32>) -> Result<Suspend<i32>, Fault>;
    let bodies: [Body; 3] = [
        |_c| Ok(Suspend::Ready(5)),
        |_c| Ok(Suspend::Suspended),
        |_c| Err(anyhow!("broken pipe")),
    ];

    for body in bodies {
        let (plain, _, _) = counting::<i32>();
        let (wrapped, _, _) = counting::<i32>();
        let expected = capture(plain, body).map_err(|e| e.to_string());
        let actual = capture_interceptable(wrapped, body).map_err(|e| e.to_string());
        assert_eq!(expected, actual);
    }
}

#[test]
fn test_claimed_fault_does_not_propagate() {
    let interceptor = Arc::new(Claiming::default());
    let (cont, _count, _last) = counting::<i32>();

    let result = capture_interceptable(cont.with_interceptor(interceptor.clone()), |_c| {
        Err(anyhow!("lost connection"))
    });

    assert_eq!(result.unwrap(), Suspend::Suspended);
    assert_eq!(interceptor.faults.load(Ordering::SeqCst), 1);
}

#[test]
fn test_resume_after_immediate_result_is_rejected() {
    let (cont, count, _last) = counting::<i32>();
    let mut stashed = None;

    let result = capture(cont, |c| {
        stashed = Some(c);
        Ok(Suspend::Ready(1))
    })
    .unwrap();
    assert_eq!(result, Suspend::Ready(1));

    let stashed = stashed.unwrap();
    assert_eq!(stashed.state(), ResumeState::Sealed);
    assert_eq!(
        stashed.resume(1),
        Err(ContinuationError::ReturnedImmediately(stashed.id()))
    );
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_safe_capture_through_trampoline_defers_synchronous_resume() {
    let trampoline = Arc::new(Trampoline::new());
    let (cont, sink) = deferred::<i32>();

    let result = capture_safe(trampoline.attach(cont), |c| {
        c.resume(21)?;
        Ok(())
    })
    .unwrap();

    assert_eq!(result, Suspend::Suspended);
    assert!(sink.try_take().is_none());
    trampoline.run_pending();
    assert_eq!(sink.try_take().unwrap().unwrap(), 21);
}

#[test]
fn test_chained_suspensions_drain_in_one_pass() {
    let trampoline = Arc::new(Trampoline::new());
    let (outer, sink) = deferred::<i32>();
    let outer = trampoline.attach(outer);

    // The inner step's completion captures again, forwarding to the outer
    // continuation through the same trampoline.
    let inner = trampoline.attach(Continuation::from_fn(move |outcome: Result<i32, Fault>| {
        let value = outcome.unwrap_or(-1);
        let _ = capture_interceptable(outer, |_c| Ok(Suspend::Ready(value + 1)));
    }));

    let result = capture_interceptable(inner, |_c| Ok(Suspend::Ready(1))).unwrap();
    assert_eq!(result, Suspend::Suspended);

    assert_eq!(trampoline.run_pending(), 2);
    assert_eq!(sink.try_take().unwrap().unwrap(), 2);
}
