//! C2 — clock loop: runs a benchmark's routine `count` times back-to-back
//! and returns the elapsed seconds, or installs the deferred continuation.
//!
//! This crate only implements the indirect-call batch shape (spec §4.2,
//! §9): the routine is always reached through a boxed closure rather than
//! textually inlined into the measurement loop. The spec allows this as the
//! legitimate baseline when the host cannot introspect and re-embed source
//! ("If the host cannot inline at all, the indirect-call shape is the
//! mandatory baseline and the degraded resolution is a legitimate
//! outcome."), which is always the case for a boxed `dyn FnMut` stored
//! behind a library API. `CompilationRefused` is consequently unreachable
//! here — recorded as an Open Question decision in DESIGN.md.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::benchmark::{Benchmark, Routine};
use crate::error::BenchError;

/// Per-process-unique tag embedded in each batch invocation's bookkeeping,
/// the Rust analogue of spec §4.2's integrity tag: since a boxed `FnMut()`
/// cannot silently "return through the outer frame" the way a textually
/// inlined loop body can in a dynamic host, control-flow hijacking here
/// instead means "the routine panicked and unwound past our call" — which
/// `catch_unwind` observes directly rather than via a returned token.
static PROCESS_TAG: AtomicU64 = AtomicU64::new(0);

fn process_tag() -> u64 {
    let existing = PROCESS_TAG.load(Ordering::Relaxed);
    if existing != 0 {
        return existing;
    }
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
        | 1;
    PROCESS_TAG.store(seed, Ordering::Relaxed);
    seed
}

/// Runs the untimed pre-test call: a single invocation of the routine,
/// trapping panics so they can be reported as `PreTestPanicked` rather than
/// unwinding across the measurement core (spec §4.2).
pub fn pre_test(benchmark: &Benchmark) -> Result<(), BenchError> {
    let _ = process_tag();
    if benchmark.error.as_deref() == Some(&BenchError::EmptyBody) {
        return Err(BenchError::EmptyBody);
    }
    match &benchmark.routine {
        Routine::Sync(routine) => {
            let routine = routine.clone();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                (routine.lock())();
            }));
            result.map_err(|payload| BenchError::PreTestPanicked(panic_message(&payload)))
        }
        // The deferred protocol's own serialization (one fresh `Deferred`
        // handle per iteration) makes a separate untimed pre-test redundant:
        // the first iteration of the real batch already validates the
        // routine is callable and resolves.
        Routine::Deferred(_) => Ok(()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs the real synchronous batch: `count` back-to-back calls to the
/// routine, timed between a start- and stop-timestamp. Returns the elapsed
/// seconds, or `BodyThrewInRun` if the routine panicked partway through.
pub fn run_sync_batch(benchmark: &Benchmark, count: u64) -> Result<f64, BenchError> {
    let routine = match &benchmark.routine {
        Routine::Sync(routine) => routine.clone(),
        Routine::Deferred(_) => return Err(BenchError::CompilationRefused),
    };

    if let Some(setup) = &benchmark.setup {
        (setup.lock())();
    }

    let start = benchmark.timer.now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut f = routine.lock();
        for _ in 0..count {
            (f)();
        }
    }));
    let elapsed = benchmark.timer.now() - start;

    if let Some(teardown) = &benchmark.teardown {
        (teardown.lock())();
    }

    result
        .map(|()| elapsed)
        .map_err(|payload| BenchError::BodyThrewInRun(panic_message(&payload)))
}

/// Runs the deferred batch (spec §4.4), returning `None` if the batch was
/// aborted mid-flight.
pub async fn run_deferred_batch(
    benchmark: &mut Benchmark,
    count: u64,
    aborted: Arc<AtomicBool>,
) -> Result<Option<f64>, BenchError> {
    crate::deferred::run_deferred_batch(benchmark, count, aborted).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::BenchmarkOptions;
    use crate::timer::TimerRegistry;

    fn test_benchmark(routine: Routine) -> Benchmark {
        let timer = TimerRegistry::with_defaults().select().unwrap();
        let opts = BenchmarkOptions::for_timer(&timer);
        Benchmark::new("clock-loop-test", routine, opts, timer)
    }

    #[test]
    fn pre_test_passes_for_a_healthy_routine() {
        let b = test_benchmark(Routine::sync(|| {}));
        assert!(pre_test(&b).is_ok());
    }

    #[test]
    fn pre_test_reports_empty_body() {
        let timer = TimerRegistry::with_defaults().select().unwrap();
        let opts = BenchmarkOptions::for_timer(&timer);
        let b = Benchmark::noop("noop", opts, timer);
        assert!(matches!(pre_test(&b), Err(BenchError::EmptyBody)));
    }

    #[test]
    fn pre_test_traps_a_panicking_routine() {
        let b = test_benchmark(Routine::sync(|| panic!("boom")));
        let prev_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let result = pre_test(&b);
        panic::set_hook(prev_hook);
        assert!(matches!(result, Err(BenchError::PreTestPanicked(_))));
    }

    #[test]
    fn run_sync_batch_counts_exact_invocations() {
        let calls = std::sync::Arc::new(AtomicU64::new(0));
        let c = calls.clone();
        let b = test_benchmark(Routine::sync(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let elapsed = run_sync_batch(&b, 100).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 100);
        assert!(elapsed >= 0.0);
    }

    #[test]
    fn run_sync_batch_reports_panic_as_body_threw_in_run() {
        let b = test_benchmark(Routine::sync(|| panic!("explode")));
        let prev_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let result = run_sync_batch(&b, 10);
        panic::set_hook(prev_hook);
        assert!(matches!(result, Err(BenchError::BodyThrewInRun(_))));
    }
}
