//! A named collection of benchmarks run together (spec §3 suite concept).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::benchmark::Benchmark;
use crate::event::EventKind;
use crate::invoker::{CompletionLog, DispatchMode, Invoker};

/// A collection of benchmarks, run together and reported as one unit.
pub struct Suite {
    name: String,
    benchmarks: Vec<Benchmark>,
    mode: DispatchMode,
}

impl Suite {
    /// Creates an empty suite, run in queue (sequential) mode by default.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), benchmarks: Vec::new(), mode: DispatchMode::Queue }
    }

    /// Switches this suite to run its benchmarks concurrently.
    pub fn concurrently(mut self) -> Self {
        self.mode = DispatchMode::Map;
        self
    }

    /// Adds `benchmark` to the suite, firing an `Add` event on it.
    pub fn add(&mut self, benchmark: Benchmark) -> &mut Self {
        benchmark.emit(EventKind::Add);
        self.benchmarks.push(benchmark);
        self
    }

    /// The suite's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The benchmarks currently held by this suite, in insertion order.
    pub fn benchmarks(&self) -> &[Benchmark] {
        &self.benchmarks
    }

    /// Mutable access to the held benchmarks, e.g. to apply CLI overrides
    /// to each one's options before running.
    pub fn benchmarks_mut(&mut self) -> &mut [Benchmark] {
        &mut self.benchmarks
    }

    /// Runs every benchmark in the suite to completion and returns the
    /// finished benchmarks (in original insertion order) plus a log of
    /// completion order, which differs from insertion order in `Map` mode.
    pub async fn run(&mut self) -> CompletionLog {
        let benchmarks = std::mem::take(&mut self.benchmarks);
        let aborted = Arc::new(AtomicBool::new(false));
        let invoker = Invoker::new(self.mode);
        let (results, log) = invoker.run(benchmarks, aborted).await;
        self.benchmarks = results;
        log
    }

    /// Runs every benchmark under a caller-supplied abort flag, so the
    /// caller can cancel the whole suite from outside (e.g. on Ctrl-C).
    pub async fn run_with_abort(&mut self, aborted: Arc<AtomicBool>) -> CompletionLog {
        let benchmarks = std::mem::take(&mut self.benchmarks);
        let invoker = Invoker::new(self.mode);
        let (results, log) = invoker.run(benchmarks, aborted).await;
        self.benchmarks = results;
        log
    }

    /// Whether any benchmark in the suite recorded an error.
    pub fn has_failures(&self) -> bool {
        self.benchmarks.iter().any(|b| b.error.is_some())
    }

    /// The fastest benchmark by measured rate, or `None` if the suite is
    /// empty or no benchmark has completed sampling yet.
    pub fn fastest(&self) -> Option<&Benchmark> {
        self.benchmarks
            .iter()
            .filter(|b| !b.stats.is_empty())
            .max_by(|a, b| a.hz.total_cmp(&b.hz))
    }
}
