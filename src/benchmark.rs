//! The benchmark data model (spec §3): identity, routine, configuration,
//! dynamic counters, results, status, and clone lineage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::BenchError;
use crate::event::{Event, EventBus, EventKind, Listener};
use crate::stats::SampleStats;
use crate::timer::Timer;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Immutable configuration for a benchmark, set at construction (spec §3, §6).
#[derive(Clone, Copy, Debug)]
pub struct BenchmarkOptions {
    /// Inter-cycle pause, in seconds. Only observed in async mode.
    pub delay: f64,
    /// Starting iterations per cycle.
    pub init_count: u64,
    /// Target per-cycle duration, in seconds.
    pub min_time: f64,
    /// Total measurement budget, in seconds (clocking time only, not delay).
    pub max_time: f64,
    /// Lower bound on the number of samples the sampling controller collects.
    pub min_samples: u64,
    /// Relative margin of error, as a percentage, below which sampling may
    /// stop once `min_samples` has also been satisfied.
    pub target_rme: f64,
    /// Cycles run without blocking the host (next cycle is scheduled via delay).
    pub async_mode: bool,
    /// The routine signals completion explicitly via `Deferred::resolve`.
    pub defer: bool,
}

impl BenchmarkOptions {
    /// Default options computed against a selected timer, so that `min_time`
    /// keeps measurement uncertainty at or below 1% (spec §4.1/§6:
    /// "measurement uncertainty is ≤1%" — i.e. `resolution / min_time <= 0.01`).
    pub fn for_timer(timer: &Timer) -> Self {
        Self {
            delay: 0.005,
            init_count: 1,
            min_time: (timer.resolution * 100.0).max(0.05),
            max_time: 5.0,
            min_samples: 5,
            target_rme: 1.0,
            async_mode: false,
            defer: false,
        }
    }
}

/// Per-cycle and cumulative timing results (spec §3 `times` record).
#[derive(Clone, Copy, Debug, Default)]
pub struct CycleTimes {
    /// Duration of the most recently completed cycle, in seconds (`period * count`).
    pub cycle: f64,
    /// Total elapsed time of the whole benchmark run, set once at completion.
    pub elapsed: f64,
    /// Seconds per operation, `cycle / count`. At completion this is the sample mean.
    pub period: f64,
    /// Seconds-since-epoch timestamp of the most recent cycle boundary.
    pub timestamp: f64,
}

/// Reentrancy guard for `abort`/`reset`, modeled as benchmark-local state
/// rather than a process-global flag (spec §9 Design Note).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GuardState {
    #[default]
    Idle,
    Resetting,
    Aborting,
}

/// The body of a benchmark: either a plain synchronous routine, or a
/// deferred routine that signals completion explicitly (spec §4.4).
///
/// Shared via `Arc<Mutex<_>>` rather than cloned per-clone: the spec's
/// concurrency model guarantees at most one clone of a benchmark clocks at
/// any instant (spec §5), so a mutex around the shared closure state is
/// sufficient and avoids re-constructing the routine per clone.
#[derive(Clone)]
pub enum Routine {
    /// Called `count` times back-to-back inside the clock loop.
    Sync(Arc<Mutex<dyn FnMut() + Send>>),
    /// Called once per clock-loop iteration; the routine must eventually call
    /// `Deferred::resolve()` on the handle it is given.
    Deferred(Arc<Mutex<dyn FnMut(crate::deferred::Deferred) + Send>>),
}

impl Routine {
    /// Wraps a plain synchronous closure as a routine.
    pub fn sync<F: FnMut() + Send + 'static>(f: F) -> Self {
        Routine::Sync(Arc::new(Mutex::new(f)))
    }

    /// Wraps a deferred closure as a routine.
    pub fn deferred<F: FnMut(crate::deferred::Deferred) + Send + 'static>(f: F) -> Self {
        Routine::Deferred(Arc::new(Mutex::new(f)))
    }

    /// Whether this routine requires the deferred protocol.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Routine::Deferred(_))
    }
}

/// A single benchmark: a named routine plus its running state and results.
pub struct Benchmark {
    /// Process-unique identity.
    pub id: u64,
    /// Human-readable name.
    pub name: String,
    /// The test routine.
    pub routine: Routine,
    /// Immutable configuration.
    pub options: BenchmarkOptions,
    /// The timer this benchmark clocks against.
    pub timer: Timer,

    /// Current iterations per cycle.
    pub count: u64,
    /// Cycles completed so far.
    pub cycles: u64,
    /// Operations per second, `1 / times.period`.
    pub hz: f64,
    /// Timing results.
    pub times: CycleTimes,
    /// Sample statistics.
    pub stats: SampleStats,

    /// Whether the benchmark is currently running.
    pub running: bool,
    /// Whether the benchmark was aborted.
    pub aborted: bool,
    /// The last error recorded, if any.
    pub error: Option<Arc<BenchError>>,

    /// If this benchmark is a clone created for sampling, the id of its source.
    pub source_id: Option<u64>,

    /// The event bus listeners are registered against.
    pub events: EventBus,

    /// Runs once before each cycle's batch, untimed.
    pub setup: Option<Arc<Mutex<dyn FnMut() + Send>>>,
    /// Runs once after each cycle's batch, untimed.
    pub teardown: Option<Arc<Mutex<dyn FnMut() + Send>>>,

    guard: GuardState,
}

impl Benchmark {
    /// Creates a new benchmark in the detached (not running) state.
    pub fn new(name: impl Into<String>, routine: Routine, options: BenchmarkOptions, timer: Timer) -> Self {
        Self {
            id: next_id(),
            name: name.into(),
            routine,
            count: options.init_count,
            options,
            timer,
            cycles: 0,
            hz: 0.0,
            times: CycleTimes::default(),
            stats: SampleStats::new(),
            running: false,
            aborted: false,
            error: None,
            source_id: None,
            events: EventBus::new(),
            setup: None,
            teardown: None,
            guard: GuardState::Idle,
        }
    }

    /// Attaches an untimed setup closure, run once before each cycle's batch.
    pub fn with_setup<F: FnMut() + Send + 'static>(mut self, f: F) -> Self {
        self.setup = Some(Arc::new(Mutex::new(f)));
        self
    }

    /// Attaches an untimed teardown closure, run once after each cycle's batch.
    pub fn with_teardown<F: FnMut() + Send + 'static>(mut self, f: F) -> Self {
        self.teardown = Some(Arc::new(Mutex::new(f)));
        self
    }

    /// Creates a detached benchmark whose routine does nothing. Used to
    /// exercise the `EmptyBody` failure mode deliberately (spec §4.2 —
    /// Rust's compiler does not perform the host-level dead-code elision
    /// the spec's pre-test otherwise infers, see SPEC_FULL.md §4.2).
    pub fn noop(name: impl Into<String>, options: BenchmarkOptions, timer: Timer) -> Self {
        let mut b = Self::new(name, Routine::sync(|| {}), options, timer);
        b.error = Some(Arc::new(BenchError::EmptyBody));
        b
    }

    /// Emits `event` on this benchmark's bus.
    pub fn emit(&self, kind: EventKind) -> Event {
        let mut ev = Event::new(kind, self.id);
        self.events.emit(&mut ev);
        ev
    }

    /// Registers a listener for `kind`.
    pub fn on(&self, kind: EventKind, listener: Listener) {
        self.events.on(kind, listener);
    }

    /// Creates an independent clone for the sampling controller (spec §4.5):
    /// shares configuration, routine, and timer; starts with fresh
    /// times/stats/running/error.
    pub fn clone_for_sampling(&self) -> Benchmark {
        Benchmark {
            id: next_id(),
            name: self.name.clone(),
            routine: self.routine.clone(),
            options: self.options,
            timer: self.timer.clone(),
            count: self.options.init_count,
            cycles: 0,
            hz: 0.0,
            times: CycleTimes::default(),
            stats: SampleStats::new(),
            running: false,
            aborted: false,
            error: None,
            source_id: Some(self.id),
            events: EventBus::new(),
            setup: self.setup.clone(),
            teardown: self.teardown.clone(),
            guard: GuardState::Idle,
        }
    }

    /// Aborts the benchmark: sets `aborted`, clears `running`, fires an
    /// `abort` event. Cooperative per spec §5 — callers must still honor
    /// `aborted` at their next cycle boundary.
    pub fn abort(&mut self) {
        if self.guard == GuardState::Resetting {
            // Reentrancy guard: abort() called from within reset() is a no-op,
            // matching the source's `calledBy.reset` guard (spec §5).
            return;
        }
        if self.aborted {
            return;
        }
        self.guard = GuardState::Aborting;
        self.aborted = true;
        self.running = false;
        self.emit(EventKind::Abort);
        self.guard = GuardState::Idle;
    }

    /// Resets the benchmark to a state indistinguishable from just after
    /// construction (spec §8 round-trip property): same configuration, empty
    /// sample, zero counters, not running.
    pub fn reset(&mut self) {
        if self.guard == GuardState::Aborting {
            return;
        }
        self.guard = GuardState::Resetting;
        if self.running && !self.aborted {
            self.abort();
        }
        self.count = self.options.init_count;
        self.cycles = 0;
        self.hz = 0.0;
        self.times = CycleTimes::default();
        self.stats = SampleStats::new();
        self.running = false;
        self.aborted = false;
        self.error = None;
        self.emit(EventKind::Reset);
        self.guard = GuardState::Idle;
    }

    /// Records `err` on this benchmark: sets `error`, and the next cycle
    /// boundary will transition `running` to `false` (spec §3 invariant).
    pub fn record_error(&mut self, err: BenchError) {
        self.error = Some(Arc::new(err));
        self.emit(EventKind::Error);
    }
}
