//! Running sample statistics for the sampling controller.
//!
//! Always Student's t, two-tailed, 95% confidence, exactly as specified:
//! mean, variance (Bessel-corrected), standard deviation, standard error of
//! the mean, margin of error, and relative margin of error.

mod ttable;

pub use ttable::critical;

use crate::histogram::PeriodHistogram;

/// The accumulated statistics of a benchmark's sample distribution.
#[derive(Clone, Debug, Default)]
pub struct SampleStats {
    /// Per-operation periods (seconds), in the order samples were produced.
    pub sample: Vec<f64>,
    /// Arithmetic mean of `sample`.
    pub mean: f64,
    /// Bessel-corrected variance of `sample` (0 for n < 2).
    pub variance: f64,
    /// Standard deviation (`sqrt(variance)`).
    pub deviation: f64,
    /// Standard error of the mean (`deviation / sqrt(n)`).
    pub sem: f64,
    /// Margin of error at 95% confidence (`sem * critical(n - 1)`).
    pub moe: f64,
    /// Relative margin of error, as a percentage of the mean.
    pub rme: f64,
    /// Full distribution of recorded periods, for percentile reporting.
    pub histogram: PeriodHistogram,
}

impl SampleStats {
    /// Creates an empty statistics record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new sample and recomputes every derived statistic atomically,
    /// so no observer ever sees a `mean`/`moe`/`rme` that disagrees with
    /// `sample` (spec §5 ordering guarantee).
    pub fn push(&mut self, period: f64) {
        self.sample.push(period);
        self.histogram.record(period);
        self.recompute();
    }

    fn recompute(&mut self) {
        let n = self.sample.len();
        debug_assert!(n > 0, "recompute called on an empty sample");

        let sum: f64 = self.sample.iter().sum();
        self.mean = sum / n as f64;

        self.variance = if n > 1 {
            let sq_dev: f64 = self.sample.iter().map(|x| (x - self.mean).powi(2)).sum();
            sq_dev / (n as f64 - 1.0)
        } else {
            0.0
        };
        self.deviation = self.variance.sqrt();
        self.sem = self.deviation / (n as f64).sqrt();

        let df = (n as u32).saturating_sub(1);
        self.moe = self.sem * critical(df);
        self.rme = if self.mean != 0.0 { (self.moe / self.mean) * 100.0 } else { 0.0 };
    }

    /// Number of samples collected so far.
    pub fn len(&self) -> usize {
        self.sample.len()
    }

    /// Whether no samples have been collected yet.
    pub fn is_empty(&self) -> bool {
        self.sample.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_updates_mean_incrementally() {
        let mut s = SampleStats::new();
        for x in [0.01, 0.02, 0.03] {
            s.push(x);
        }
        let expected_mean: f64 = [0.01, 0.02, 0.03].iter().sum::<f64>() / 3.0;
        assert!((s.mean - expected_mean).abs() < 1e-12);
    }

    #[test]
    fn single_sample_has_zero_variance_and_moe() {
        let mut s = SampleStats::new();
        s.push(0.05);
        assert_eq!(s.variance, 0.0);
        assert_eq!(s.sem, 0.0);
        assert_eq!(s.moe, 0.0);
        assert_eq!(s.rme, 0.0);
    }

    #[test]
    fn moe_matches_critical_times_sem() {
        let mut s = SampleStats::new();
        for x in [0.010, 0.011, 0.012, 0.010, 0.011] {
            s.push(x);
        }
        let expected = s.sem * critical(4);
        assert!((s.moe - expected).abs() < 1e-12);
    }

    #[test]
    fn rme_is_zero_when_mean_is_zero() {
        let mut s = SampleStats::new();
        s.push(0.0);
        s.push(0.0);
        assert_eq!(s.rme, 0.0);
    }

    proptest::proptest! {
        /// Pushing samples one at a time always lands on the same mean and
        /// moe as recomputing from the full slice at once, for any sequence
        /// of positive periods.
        #[test]
        fn push_matches_a_from_scratch_recompute(periods in proptest::collection::vec(1e-9f64..10.0, 1..50)) {
            let mut incremental = SampleStats::new();
            for &p in &periods {
                incremental.push(p);
            }

            let mut from_scratch = SampleStats::new();
            from_scratch.sample = periods.clone();
            from_scratch.recompute();

            prop_assert!((incremental.mean - from_scratch.mean).abs() < 1e-9);
            prop_assert!((incremental.moe - from_scratch.moe).abs() < 1e-9);
            prop_assert_eq!(incremental.sample.len(), periods.len());
        }
    }
}
