//! A thin wrapper around [`hdrhistogram::Histogram`] for per-sample period
//! distributions, reported alongside the mean/moe/rme summary.

use std::time::Duration;

use hdrhistogram::Histogram;

pub(crate) const PERCENTAGES: &[f64] = &[50.0, 90.0, 99.0];

/// Tracks the full distribution of recorded periods, not just their mean and
/// variance, so percentile latencies can be reported next to the confidence
/// interval.
pub struct PeriodHistogram {
    hist: Histogram<u64>,
}

impl PeriodHistogram {
    /// Creates a new, empty histogram.
    pub fn new() -> Self {
        Self { hist: Histogram::<u64>::new(3).expect("create histogram") }
    }

    /// Records one period, given in seconds. Values that don't fit in a
    /// `u64` of nanoseconds (negative, `NaN`, or implausibly large) are
    /// saturated rather than rejected — the histogram is a reporting aid,
    /// not load-bearing for the statistics in [`crate::stats::SampleStats`].
    pub fn record(&mut self, period_seconds: f64) {
        let nanos = (period_seconds * 1_000_000_000.0).max(0.0).min(u64::MAX as f64) as u64;
        let _ = self.hist.record(nanos.max(1));
    }

    /// Whether any values have been recorded.
    pub fn is_empty(&self) -> bool {
        self.hist.is_empty()
    }

    /// The period at a given quantile (`q` in `0.0..=1.0`).
    pub fn value_at_quantile(&self, q: f64) -> Duration {
        Duration::from_nanos(self.hist.value_at_quantile(q))
    }

    /// Each period at the given percentages (e.g. `50.0` for the median).
    pub fn percentiles<'a>(&'a self, percentages: &'a [f64]) -> impl Iterator<Item = (f64, Duration)> + 'a {
        percentages.iter().map(|&p| (p, self.value_at_quantile(p / 100.0)))
    }
}

impl Default for PeriodHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PeriodHistogram {
    fn clone(&self) -> Self {
        Self { hist: self.hist.clone() }
    }
}

impl std::fmt::Debug for PeriodHistogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodHistogram").field("len", &self.hist.len()).finish()
    }
}
