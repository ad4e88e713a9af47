//! C3 — cycle controller: runs a benchmark's batches, growing the iteration
//! count toward `min_time`, until one batch's elapsed time actually clears
//! it — that batch is the definitive, sample-worthy measurement (spec §4.3).

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::benchmark::Benchmark;
use crate::clock_loop;
use crate::error::BenchError;
use crate::event::EventKind;

/// Divisors applied to a fixed numerator when the previous batch's elapsed
/// time was too small to distinguish from timer noise, indexed by the
/// number of consecutive undetectable batches seen so far (1-based). Each
/// step grows the next attempt's count far more aggressively than the
/// ordinary proportional formula would, on the assumption that the routine
/// is orders of magnitude faster than `min_time` rather than merely a
/// little faster. Five consecutive misses gives up (spec §4.3 "unclockable
/// rate").
const UNCLOCKABLE_NUMERATOR: f64 = 4_000_000.0;
const UNCLOCKABLE_DIVISORS: [f64; 5] = [4096.0, 512.0, 64.0, 8.0, 0.0];

fn unclockable_growth(consecutive_misses: u32) -> Option<u64> {
    let idx = (consecutive_misses.saturating_sub(1)) as usize;
    let divisor = *UNCLOCKABLE_DIVISORS.get(idx)?;
    if divisor == 0.0 {
        return None;
    }
    Some((UNCLOCKABLE_NUMERATOR / divisor).ceil() as u64)
}

/// The state a single benchmark instance is in at any point during
/// `run_cycle`'s internal bookkeeping. Exposed for diagnostics, not branched
/// on externally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Clocking,
    Evaluating,
    Scheduling,
    Done,
}

/// Drives the cycle state machine for one benchmark instance, tracking
/// consecutive unclockable attempts across batches.
pub struct CycleController {
    state: CycleState,
    consecutive_unclockable: u32,
}

impl CycleController {
    pub fn new() -> Self {
        Self { state: CycleState::Idle, consecutive_unclockable: 0 }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Runs batches of `benchmark`, growing `count` each time a batch's
    /// elapsed time falls short of `min_time`, until one batch finally
    /// clears it — that batch is "the definitive measurement" (spec §4.3):
    /// only then are `times`/`hz` updated for good, `cycles` incremented,
    /// and `cycle` emitted. Every earlier, under-`min_time` batch in this
    /// call is pure warm-up: it updates nothing externally visible and
    /// never reaches the sampling controller.
    pub async fn run_cycle(
        &mut self,
        benchmark: &mut Benchmark,
        aborted: Arc<AtomicBool>,
    ) -> Result<(), BenchError> {
        let mut first_batch = true;

        loop {
            self.state = CycleState::Clocking;

            if benchmark.cycles == 0 && first_batch {
                clock_loop::pre_test(benchmark)?;
            }
            first_batch = false;

            let count = benchmark.count;
            let elapsed = if benchmark.routine.is_deferred() {
                match clock_loop::run_deferred_batch(benchmark, count, aborted.clone()).await? {
                    Some(elapsed) => elapsed,
                    None => {
                        // Aborted mid-batch (spec §4.4): the caller forwards
                        // this as a synthetic cycle rather than a sample.
                        benchmark.aborted = true;
                        return Ok(());
                    }
                }
            } else {
                clock_loop::run_sync_batch(benchmark, count)?
            };

            self.state = CycleState::Evaluating;

            if elapsed <= benchmark.timer.resolution {
                self.consecutive_unclockable += 1;
                match unclockable_growth(self.consecutive_unclockable) {
                    Some(next_count) => {
                        log::debug!(
                            "{}: elapsed {elapsed}s at timer resolution, growing count {count} -> {next_count} ({} consecutive misses)",
                            benchmark.name,
                            self.consecutive_unclockable
                        );
                        benchmark.count = next_count.max(count + 1);
                        self.state = CycleState::Scheduling;
                        continue;
                    }
                    None => {
                        log::warn!("{}: rate unclockable after 5 consecutive misses", benchmark.name);
                        return Err(BenchError::UnclockableRate);
                    }
                }
            }
            self.consecutive_unclockable = 0;

            let period = elapsed / count as f64;
            benchmark.times.cycle = elapsed;
            benchmark.times.period = period;
            benchmark.times.timestamp = benchmark.timer.now();
            benchmark.hz = if period > 0.0 { 1.0 / period } else { 0.0 };

            if elapsed >= benchmark.options.min_time {
                benchmark.cycles += 1;
                log::debug!(
                    "{}: cycle {} converged at {elapsed}s over {count} iterations (period {period}s)",
                    benchmark.name,
                    benchmark.cycles
                );
                self.state = CycleState::Scheduling;
                let mut ev = benchmark.emit(EventKind::Cycle);
                if ev.aborted || ev.cancelled {
                    benchmark.aborted = true;
                }
                self.state = CycleState::Done;
                return Ok(());
            }

            log::debug!(
                "{}: elapsed {elapsed}s under min_time {}s, growing count {count} for another batch",
                benchmark.name,
                benchmark.options.min_time
            );
            self.state = CycleState::Scheduling;
            benchmark.count = grow_count(count, elapsed, benchmark.options.min_time);
        }
    }
}

impl Default for CycleController {
    fn default() -> Self {
        Self::new()
    }
}

/// Proportionally grows `count` so the next batch's elapsed time should land
/// near `min_time`, with a floor so a batch that already nearly met
/// `min_time` still advances by at least one iteration (spec §4.3).
fn grow_count(count: u64, elapsed: f64, min_time: f64) -> u64 {
    if elapsed <= 0.0 {
        return count.saturating_mul(2).max(count + 1);
    }
    let ratio = min_time / elapsed;
    let grown = (count as f64 * ratio).ceil();
    (grown as u64).max(count + 1)
}

/// Drives a clone through exactly one converged cycle on behalf of the
/// sampling controller's clone queue (spec §4.5), routed through the
/// invoker (C6) as `CycleOp` (spec §2: "C5 enqueues clone benchmarks into
/// the invoker C6"). Failures are recorded on the clone itself rather than
/// returned — the sampling controller inspects `clone.error`/`clone.aborted`
/// after the invoker hands the clone back.
pub(crate) fn box_run_to_convergence(
    benchmark: &mut Benchmark,
    aborted: Arc<AtomicBool>,
) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
    Box::pin(async move {
        benchmark.emit(EventKind::Start);
        let mut controller = CycleController::new();
        if let Err(err) = controller.run_cycle(benchmark, aborted).await {
            benchmark.aborted = true;
            benchmark.record_error(err);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{BenchmarkOptions, Routine};
    use crate::timer::TimerRegistry;
    use std::sync::atomic::AtomicU64;

    fn test_benchmark() -> Benchmark {
        let timer = TimerRegistry::with_defaults().select().unwrap();
        let mut opts = BenchmarkOptions::for_timer(&timer);
        opts.min_time = 0.02;
        Benchmark::new("cycle-test", Routine::sync(|| {}), opts, timer)
    }

    #[tokio::test]
    async fn run_cycle_converges_once_min_time_is_reached() {
        let mut b = test_benchmark();
        let mut ctrl = CycleController::new();
        let aborted = Arc::new(AtomicBool::new(false));

        ctrl.run_cycle(&mut b, aborted).await.unwrap();

        assert_eq!(b.cycles, 1);
        assert!(b.times.cycle >= b.options.min_time);
        assert_eq!(ctrl.state(), CycleState::Done);
    }

    #[tokio::test]
    async fn unclockable_rate_gives_up_after_five_misses() {
        let mut b = test_benchmark();
        b.timer.resolution = 1.0; // impossibly coarse, so every batch looks undetectable
        let mut ctrl = CycleController::new();
        let aborted = Arc::new(AtomicBool::new(false));

        let result = ctrl.run_cycle(&mut b, aborted).await;
        assert!(matches!(result, Err(BenchError::UnclockableRate)));
    }

    #[tokio::test]
    async fn pre_test_runs_only_on_the_first_cycle() {
        let calls = Arc::new(AtomicU64::new(0));
        let c = calls.clone();
        let timer = TimerRegistry::with_defaults().select().unwrap();
        let mut opts = BenchmarkOptions::for_timer(&timer);
        opts.min_time = 0.001;
        let mut b = Benchmark::new(
            "counted",
            Routine::sync(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
            opts,
            timer,
        );
        let mut ctrl = CycleController::new();
        let aborted = Arc::new(AtomicBool::new(false));

        ctrl.run_cycle(&mut b, aborted.clone()).await.unwrap();
        let after_first = calls.load(Ordering::SeqCst);
        let converged_count = b.count;

        ctrl.run_cycle(&mut b, aborted).await.unwrap();
        let after_second = calls.load(Ordering::SeqCst);

        // Once converged, `count` no longer grows, so a repeat cycle at the
        // same count accounts for the entire increment — no extra pre-test
        // call hides in there.
        assert_eq!(after_second - after_first, converged_count);
    }

    #[test]
    fn grow_count_always_advances_past_the_current_count() {
        assert!(grow_count(1, 0.000_001, 0.02) > 1);
        assert!(grow_count(100, 0.019, 0.02) > 100);
        assert_eq!(grow_count(5, 0.0, 0.02), 10);
    }
}
