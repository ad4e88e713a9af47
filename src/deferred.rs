//! C4 — deferred protocol: lets a routine signal completion explicitly
//! instead of returning, so async work can be measured without blocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::benchmark::{Benchmark, Routine};
use crate::error::BenchError;

struct DeferredInner {
    notify: Notify,
    resolved: AtomicBool,
    double_resolve: AtomicBool,
}

/// A handle given to a deferred routine for one iteration. The routine must
/// call [`Deferred::resolve`] exactly once when it considers that iteration
/// finished.
#[derive(Clone)]
pub struct Deferred {
    inner: Arc<DeferredInner>,
}

impl Deferred {
    fn new() -> Self {
        Self {
            inner: Arc::new(DeferredInner {
                notify: Notify::new(),
                resolved: AtomicBool::new(false),
                double_resolve: AtomicBool::new(false),
            }),
        }
    }

    /// Signals that this iteration's work has finished.
    ///
    /// Calling this more than once per iteration is flagged rather than left
    /// undefined (spec §4.4 "ordering" note): the second call sets a sticky
    /// error the clock loop surfaces as [`BenchError::DeferredDoubleResolve`].
    pub fn resolve(&self) {
        if self.inner.resolved.swap(true, Ordering::SeqCst) {
            self.inner.double_resolve.store(true, Ordering::SeqCst);
            return;
        }
        self.inner.notify.notify_one();
    }
}

/// Runs one deferred batch of `count` iterations, serialized strictly (a
/// fresh [`Deferred`] handle per iteration, so resolves cannot race across
/// iterations — spec §4.4 step 1–2). Returns the measured elapsed seconds,
/// or `Ok(None)` if the batch was aborted mid-flight (the caller is expected
/// to run teardown and emit a synthetic cycle per spec §4.4).
pub async fn run_deferred_batch(
    benchmark: &mut Benchmark,
    count: u64,
    aborted: Arc<AtomicBool>,
) -> Result<Option<f64>, BenchError> {
    let routine = match &benchmark.routine {
        Routine::Deferred(r) => r.clone(),
        Routine::Sync(_) => return Err(BenchError::CompilationRefused),
    };

    if let Some(setup) = &benchmark.setup {
        (setup.lock())();
    }

    let start = benchmark.timer.now();
    let mut cycles = 0u64;
    while cycles < count {
        if aborted.load(Ordering::SeqCst) {
            if let Some(teardown) = &benchmark.teardown {
                (teardown.lock())();
            }
            return Ok(None);
        }

        let handle = Deferred::new();
        {
            let mut f = routine.lock();
            (f)(handle.clone());
        }
        handle.inner.notify.notified().await;

        if handle.inner.double_resolve.load(Ordering::SeqCst) {
            return Err(BenchError::DeferredDoubleResolve);
        }
        cycles += 1;
    }

    let elapsed = benchmark.timer.now() - start;
    if let Some(teardown) = &benchmark.teardown {
        (teardown.lock())();
    }
    Ok(Some(elapsed))
}
