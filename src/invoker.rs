//! C6 — invoker: drives a list of benchmarks through an operation, either
//! strictly sequential ("queue" mode, spec §4.6 default) or concurrently
//! ("map" mode). Takes ownership of the benchmarks it runs and hands them
//! back so callers can read final results.
//!
//! The operation itself is pluggable: `Invoker::run` drives each benchmark
//! through the full sampling lifecycle (used by [`crate::suite::Suite`]),
//! while the sampling controller (C5) drives its clone queue through this
//! same invoker with a different operation — one converged cycle per clone
//! (spec §2: "C5 enqueues clone benchmarks into the invoker C6").

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;

use crate::benchmark::Benchmark;
use crate::event::EventKind;
use crate::sampling;

/// A per-benchmark operation the invoker drives to completion, boxed so
/// `Queue` and `Map` mode can share one dispatch path regardless of which
/// operation is in play. Always a plain function (never a capturing
/// closure), so it stays `Send + 'static` for `Map` mode's spawned tasks
/// without needing `Arc<dyn Fn>` bookkeeping.
pub(crate) type CycleOp =
    for<'a> fn(&'a mut Benchmark, Arc<AtomicBool>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

fn box_full_sample(benchmark: &mut Benchmark, aborted: Arc<AtomicBool>) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
    Box::pin(sampling::sample(benchmark, aborted))
}

/// How an [`Invoker`] schedules multiple benchmarks relative to one another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Run benchmarks one at a time, in list order (spec §4.6 default).
    #[default]
    Queue,
    /// Run all benchmarks concurrently, each on its own task.
    Map,
}

/// Tracks which benchmark ids completed, and in what order, by installing a
/// one-shot listener ahead of any user listeners (spec §4.6: the invoker's
/// own bookkeeping must observe `Complete` before user code does).
#[derive(Clone, Default)]
pub struct CompletionLog {
    order: Arc<Mutex<Vec<u64>>>,
}

impl CompletionLog {
    fn install(&self, benchmark: &Benchmark) {
        let order = self.order.clone();
        benchmark.events.on_first(
            EventKind::Complete,
            Arc::new(move |ev| {
                order.lock().push(ev.target);
                true
            }),
        );
    }

    /// Ids of completed benchmarks, in the order each one finished.
    pub fn completion_order(&self) -> Vec<u64> {
        self.order.lock().clone()
    }
}

/// Drives a batch of benchmarks through `start -> cycle* -> complete`.
pub struct Invoker {
    mode: DispatchMode,
}

impl Invoker {
    pub fn new(mode: DispatchMode) -> Self {
        Self { mode }
    }

    /// Runs every benchmark in `benchmarks` to completion under a shared
    /// abort flag, returning them (reordered back to their original
    /// position for `Map` mode) alongside a log of completion order.
    pub async fn run(&self, benchmarks: Vec<Benchmark>, aborted: Arc<AtomicBool>) -> (Vec<Benchmark>, CompletionLog) {
        self.run_op(benchmarks, aborted, box_full_sample).await
    }

    /// Runs every benchmark through `op` instead of the full sampling
    /// lifecycle. `pub(crate)` because only the sampling controller's clone
    /// queue calls this directly; every external caller goes through `run`.
    pub(crate) async fn run_op(
        &self,
        benchmarks: Vec<Benchmark>,
        aborted: Arc<AtomicBool>,
        op: CycleOp,
    ) -> (Vec<Benchmark>, CompletionLog) {
        let log = CompletionLog::default();
        for b in &benchmarks {
            log.install(b);
        }

        let results = match self.mode {
            DispatchMode::Queue => self.run_queue(benchmarks, aborted, op).await,
            DispatchMode::Map => self.run_map(benchmarks, aborted, op).await,
        };
        (results, log)
    }

    async fn run_queue(&self, mut benchmarks: Vec<Benchmark>, aborted: Arc<AtomicBool>, op: CycleOp) -> Vec<Benchmark> {
        for b in benchmarks.iter_mut() {
            if aborted.load(Ordering::SeqCst) {
                b.abort();
                continue;
            }
            op(b, aborted.clone()).await;
        }
        benchmarks
    }

    async fn run_map(&self, benchmarks: Vec<Benchmark>, aborted: Arc<AtomicBool>, op: CycleOp) -> Vec<Benchmark> {
        let mut set = JoinSet::new();
        for (index, mut b) in benchmarks.into_iter().enumerate() {
            let aborted = aborted.clone();
            set.spawn(async move {
                op(&mut b, aborted).await;
                (index, b)
            });
        }

        let mut slots: Vec<Option<Benchmark>> = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, b)) => {
                    if slots.len() <= index {
                        slots.resize_with(index + 1, || None);
                    }
                    slots[index] = Some(b);
                }
                Err(_join_error) => {
                    // A task panicked outside the routine's own catch_unwind
                    // boundary (e.g. inside tokio's scheduler); nothing
                    // meaningful to recover, so the slot is simply dropped.
                }
            }
        }
        slots.into_iter().flatten().collect()
    }
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new(DispatchMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{BenchmarkOptions, Routine};
    use crate::timer::TimerRegistry;

    fn test_benchmark(name: &str) -> Benchmark {
        let timer = TimerRegistry::with_defaults().select().unwrap();
        let mut opts = BenchmarkOptions::for_timer(&timer);
        opts.min_time = 0.001;
        opts.max_time = 0.05;
        opts.min_samples = 2;
        opts.target_rme = 100.0;
        Benchmark::new(name, Routine::sync(|| {}), opts, timer)
    }

    #[tokio::test]
    async fn queue_mode_runs_every_benchmark_to_completion() {
        let benchmarks = vec![test_benchmark("a"), test_benchmark("b"), test_benchmark("c")];
        let invoker = Invoker::new(DispatchMode::Queue);
        let aborted = Arc::new(AtomicBool::new(false));

        let (results, log) = invoker.run(benchmarks, aborted).await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|b| !b.running && b.stats.len() > 0));
        assert_eq!(log.completion_order().len(), 3);
    }

    #[tokio::test]
    async fn map_mode_preserves_original_order_in_the_result() {
        let names = vec!["a", "b", "c", "d"];
        let benchmarks: Vec<Benchmark> = names.iter().map(|n| test_benchmark(n)).collect();
        let invoker = Invoker::new(DispatchMode::Map);
        let aborted = Arc::new(AtomicBool::new(false));

        let (results, _log) = invoker.run(benchmarks, aborted).await;

        let result_names: Vec<&str> = results.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(result_names, names);
    }

    #[tokio::test]
    async fn aborted_flag_set_before_start_skips_every_benchmark() {
        let benchmarks = vec![test_benchmark("a"), test_benchmark("b")];
        let invoker = Invoker::new(DispatchMode::Queue);
        let aborted = Arc::new(AtomicBool::new(true));

        let (results, _log) = invoker.run(benchmarks, aborted).await;
        assert!(results.iter().all(|b| b.aborted));
    }
}
