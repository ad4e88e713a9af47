//! C1 — timer registry: enumerate candidate time sources, probe their
//! resolution, and pick the finest-grained one that works on this host.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::error::TimerError;

/// Number of samples taken while probing a candidate's resolution (spec §4.1: "≥30 iterations").
const PROBE_ITERATIONS: usize = 30;

/// A candidate source of monotonic-ish time.
pub trait TimeSource: Send + Sync {
    /// A human-readable name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// The current time in seconds. Not required to be wall-clock accurate,
    /// only self-consistent and (ideally) monotonic.
    fn now(&self) -> f64;

    /// A floor imposed on this candidate's measured resolution, in seconds.
    /// E.g. the millisecond wall-clock source is known to never do better
    /// than 1.5ms regardless of what the probe measures.
    fn resolution_floor(&self) -> f64 {
        0.0
    }
}

/// A monotonic, nanosecond-resolution candidate backed by [`std::time::Instant`].
pub struct MonotonicNanos {
    epoch: Instant,
}

impl Default for MonotonicNanos {
    fn default() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl TimeSource for MonotonicNanos {
    fn name(&self) -> &'static str {
        "monotonic-nanos"
    }

    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// A non-monotonic, millisecond-resolution wall-clock candidate, kept as the
/// degraded fallback (spec §6: "wall-clock millisecond source with a 1.5ms floor").
#[derive(Default)]
pub struct WallClockMillis;

impl TimeSource for WallClockMillis {
    fn name(&self) -> &'static str {
        "wall-clock-millis"
    }

    fn now(&self) -> f64 {
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        (since_epoch.as_millis() as f64) / 1_000.0
    }

    fn resolution_floor(&self) -> f64 {
        0.0015
    }
}

/// A selected, ready-to-use timer: a time source plus its measured resolution.
///
/// Cheap to clone (an `Arc` around the source); effectively process-wide and
/// read-only once selected (spec §5).
#[derive(Clone)]
pub struct Timer {
    source: Arc<dyn TimeSource>,
    /// Mean of the smallest positive deltas observed while probing, in seconds.
    pub resolution: f64,
}

impl Timer {
    /// The current time in seconds, as reported by the underlying source.
    pub fn now(&self) -> f64 {
        self.source.now()
    }

    /// The name of the underlying time source, for diagnostics/logging.
    pub fn name(&self) -> &'static str {
        self.source.name()
    }
}

/// Probes a candidate `PROBE_ITERATIONS` times, returning the mean of the
/// smallest positive deltas observed, or `f64::INFINITY` if any delta was
/// non-positive (spec §4.1).
fn probe_resolution(source: &dyn TimeSource) -> f64 {
    let mut deltas = Vec::with_capacity(PROBE_ITERATIONS);
    let mut prev = source.now();
    for _ in 0..PROBE_ITERATIONS {
        let mut next = source.now();
        // Busy-spin until the source actually advances, so we measure its
        // true granularity rather than call overhead.
        let mut spins = 0;
        while next == prev && spins < 10_000_000 {
            next = source.now();
            spins += 1;
        }
        let delta = next - prev;
        if delta <= 0.0 {
            return f64::INFINITY;
        }
        deltas.push(delta);
        prev = next;
    }
    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
    mean.max(source.resolution_floor())
}

/// An ordered list of candidate time sources, finest resolution wins.
pub struct TimerRegistry {
    candidates: Vec<Arc<dyn TimeSource>>,
}

impl TimerRegistry {
    /// Creates a registry populated with the built-in candidates (spec §6).
    pub fn with_defaults() -> Self {
        Self {
            candidates: vec![Arc::new(MonotonicNanos::default()), Arc::new(WallClockMillis)],
        }
    }

    /// Creates an empty registry; useful for tests that want to register
    /// synthetic (possibly broken) candidates.
    pub fn empty() -> Self {
        Self { candidates: Vec::new() }
    }

    /// Registers an additional candidate, extending the registry (spec §4.1:
    /// "Additional sources are extensible through the timer registry.").
    pub fn register(&mut self, source: Arc<dyn TimeSource>) {
        self.candidates.push(source);
    }

    /// Probes every registered candidate and selects the one with the
    /// smallest resolution. Fails if every candidate is broken.
    pub fn select(&self) -> Result<Timer, TimerError> {
        let mut best: Option<(Arc<dyn TimeSource>, f64)> = None;
        for candidate in &self.candidates {
            let resolution = probe_resolution(candidate.as_ref());
            if resolution.is_finite() {
                match &best {
                    Some((_, best_res)) if *best_res <= resolution => {}
                    _ => best = Some((candidate.clone(), resolution)),
                }
            }
        }
        let (source, resolution) = best.ok_or(TimerError::NoUsableTimer)?;
        Ok(Timer { source, resolution })
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;
    impl TimeSource for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn now(&self) -> f64 {
            0.0
        }
    }

    struct Fixed(std::sync::atomic::AtomicU64);
    impl TimeSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn now(&self) -> f64 {
            self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed) as f64 * 1e-6
        }
    }

    #[test]
    fn selects_finest_resolution_among_working_candidates() {
        let mut reg = TimerRegistry::empty();
        reg.register(Arc::new(Fixed(std::sync::atomic::AtomicU64::new(0))));
        reg.register(Arc::new(MonotonicNanos::default()));
        let timer = reg.select().expect("at least one usable timer");
        assert!(timer.resolution.is_finite());
        assert!(timer.resolution > 0.0);
    }

    #[test]
    fn fails_when_every_candidate_is_broken() {
        let mut reg = TimerRegistry::empty();
        reg.register(Arc::new(Broken));
        reg.register(Arc::new(Broken));
        let err = reg.select().unwrap_err();
        assert!(matches!(err, TimerError::NoUsableTimer));
    }

    #[test]
    fn wall_clock_resolution_respects_floor() {
        let floor = WallClockMillis.resolution_floor();
        assert!((floor - 0.0015).abs() < 1e-12);
    }

    #[test]
    fn default_registry_selects_a_timer() {
        let timer = TimerRegistry::with_defaults().select().expect("default timer");
        assert!(timer.now() >= 0.0);
    }
}
