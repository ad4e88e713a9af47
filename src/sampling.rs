//! C5 — sampling controller: drives a clone queue, each clone converging to
//! exactly one cycle, until enough samples have accumulated on the source
//! benchmark at a tight enough confidence, or the time budget runs out
//! (spec §4.5).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::benchmark::Benchmark;
use crate::cycle;
use crate::error::BenchError;
use crate::event::{Event, EventKind};
use crate::invoker::{DispatchMode, Invoker};

/// The clone queue keeps at most this many pending clones waiting ahead of
/// the one currently clocking, so the next clone's pre-test doesn't need to
/// wait on the previous clone's forwarding/evaluation step (spec §4.5
/// "Queue").
const MAX_PENDING_CLONES: usize = 2;

/// Whether the time budget has been exhausted. `max_time` bounds clocking
/// time only — the inter-cycle delay in async mode is excluded, matching
/// the cycle controller's own clock measurement (spec §5).
fn maxed_out(benchmark: &Benchmark, clocking_elapsed: f64) -> bool {
    clocking_elapsed >= benchmark.options.max_time
}

/// Whether enough samples have been collected at a tight enough confidence
/// to stop early, ahead of the time budget.
fn confidently_done(benchmark: &Benchmark) -> bool {
    benchmark.stats.len() as u64 >= benchmark.options.min_samples
        && benchmark.stats.rme <= benchmark.options.target_rme
}

/// Runs `benchmark` to completion: emits `Start`, drives a bounded queue of
/// independent clones (each converging to exactly one cycle via the invoker,
/// spec §4.5 "Clones") and forwards each clone's outcome back onto
/// `benchmark`, then emits `Complete` once sampling stops for any reason.
/// Termination ladder: abort > per-clone error > budget exhaustion >
/// confidence target met. Failures are recorded on `benchmark.error` rather
/// than returned, matching the event-driven error model of spec §6 —
/// callers inspect `benchmark.error` after this returns.
pub async fn sample(benchmark: &mut Benchmark, aborted: Arc<AtomicBool>) {
    benchmark.running = true;
    benchmark.aborted = false;
    benchmark.emit(EventKind::Start);

    let invoker = Invoker::new(DispatchMode::Queue);
    let clock_start = benchmark.timer.now();
    let mut clocking_elapsed = 0.0;

    let mut queue: VecDeque<Benchmark> = VecDeque::new();
    queue.push_back(benchmark.clone_for_sampling());

    loop {
        if aborted.load(Ordering::SeqCst) {
            log::debug!("{}: external abort flag observed, stopping", benchmark.name);
            benchmark.abort();
            break;
        }

        let Some(clone) = queue.pop_front() else { break };

        let before = benchmark.timer.now();
        let (mut ran, _log) = invoker.run_op(vec![clone], aborted.clone(), cycle::box_run_to_convergence).await;
        clocking_elapsed += benchmark.timer.now() - before;
        let clone = ran.pop().expect("invoker returns exactly the benchmarks it was given");

        // Clone -> source event forwarding (spec §4.5 "Clones"). `error`
        // copies to `B` and re-emits with `B` as target; an aborted clone
        // aborts `B` and emits one synthetic `cycle`; otherwise the clone's
        // `cycle` is re-emitted on `B` with target rewritten.
        if let Some(err) = clone.error.clone() {
            log::error!("{}: {err}", benchmark.name);
            benchmark.error = Some(err.clone());
            benchmark.aborted = true;
            let mut ev = Event::new(EventKind::Error, clone.id).rewritten_for(benchmark.id);
            ev.error = Some(err);
            benchmark.events.emit(&mut ev);
            break;
        }
        if clone.aborted {
            benchmark.aborted = true;
            let mut ev = Event::new(EventKind::Cycle, clone.id).rewritten_for(benchmark.id);
            benchmark.events.emit(&mut ev);
            break;
        }

        benchmark.stats.push(clone.times.period);
        benchmark.cycles += 1;
        benchmark.count = clone.count;
        benchmark.times.cycle = clone.times.cycle;
        benchmark.times.period = clone.times.period;
        benchmark.times.timestamp = clone.times.timestamp;

        let mut ev = Event::new(EventKind::Cycle, clone.id).rewritten_for(benchmark.id);
        benchmark.events.emit(&mut ev);
        if ev.aborted || ev.cancelled {
            benchmark.aborted = true;
            break;
        }

        log::debug!(
            "{}: sample {} recorded, period {}s (rme {:.2}%)",
            benchmark.name,
            benchmark.stats.len(),
            clone.times.period,
            benchmark.stats.rme
        );

        if maxed_out(benchmark, clocking_elapsed) {
            if benchmark.stats.len() < benchmark.options.min_samples as usize {
                log::warn!(
                    "{}: exceeded time budget with only {} of {} required samples",
                    benchmark.name,
                    benchmark.stats.len(),
                    benchmark.options.min_samples
                );
                benchmark.error = Some(Arc::new(BenchError::ExceededBudget));
                benchmark.emit(EventKind::Error);
            }
            break;
        }

        if confidently_done(benchmark) {
            break;
        }

        while queue.len() < MAX_PENDING_CLONES {
            queue.push_back(benchmark.clone_for_sampling());
        }

        if benchmark.options.async_mode && benchmark.options.delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(benchmark.options.delay)).await;
        }
    }

    // Termination statistics recompute (spec §4.5): the final `hz`/`period`
    // come from the whole sample's mean, not the last clone's own cycle.
    if !benchmark.stats.is_empty() {
        benchmark.hz = 1.0 / benchmark.stats.mean;
        benchmark.times.period = benchmark.stats.mean;
        benchmark.times.cycle = benchmark.stats.mean * benchmark.count as f64;
    }

    benchmark.times.elapsed = benchmark.timer.now() - clock_start;
    benchmark.count = benchmark.options.init_count;
    benchmark.running = false;
    benchmark.emit(EventKind::Complete);
}
