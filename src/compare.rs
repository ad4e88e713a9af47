//! Comparison utility: ranks two completed benchmarks by operations per
//! second, treating overlapping confidence intervals as statistically
//! indistinguishable rather than naively comparing means (spec §4's
//! "external collaborator" comparison operation).

use crate::benchmark::Benchmark;

/// Comparison outcome between a subject benchmark and a reference one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Subject is faster than the reference, confidence intervals disjoint.
    Faster,
    /// Subject is slower than the reference, confidence intervals disjoint.
    Slower,
    /// Confidence intervals overlap; no statistically meaningful difference.
    Indistinguishable,
}

/// Ranks a subject period interval against a reference period interval,
/// independent of whether either came from a live [`Benchmark`] or a
/// persisted baseline summary. A lower period means a higher rate, so the
/// subject is judged `Faster` when its interval sits entirely below the
/// reference's.
pub fn compare_intervals(subject_mean: f64, subject_moe: f64, reference_mean: f64, reference_moe: f64) -> Verdict {
    let (s_lo, s_hi) = (subject_mean - subject_moe, subject_mean + subject_moe);
    let (r_lo, r_hi) = (reference_mean - reference_moe, reference_mean + reference_moe);

    if s_hi < r_lo {
        Verdict::Faster
    } else if s_lo > r_hi {
        Verdict::Slower
    } else {
        Verdict::Indistinguishable
    }
}

/// Compares `subject` against `reference`. Both benchmarks must have
/// completed sampling (non-empty `stats.sample`); returns `None` otherwise.
pub fn compare(subject: &Benchmark, reference: &Benchmark) -> Option<Verdict> {
    if subject.stats.is_empty() || reference.stats.is_empty() {
        return None;
    }
    let (s_mean, s_moe) = (subject.stats.mean, subject.stats.moe);
    let (r_mean, r_moe) = (reference.stats.mean, reference.stats.moe);
    Some(compare_intervals(s_mean, s_moe, r_mean, r_moe))
}

/// Relative speed of `subject` versus `reference`, as a multiple of
/// `reference`'s rate (`subject.hz / reference.hz`). `1.0` means identical
/// measured throughput, independent of whether that difference is
/// significant per [`compare`].
pub fn speedup(subject: &Benchmark, reference: &Benchmark) -> Option<f64> {
    if reference.hz == 0.0 {
        return None;
    }
    Some(subject.hz / reference.hz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{BenchmarkOptions, Routine};
    use crate::timer::TimerRegistry;

    fn benchmark_with_samples(name: &str, samples: &[f64]) -> Benchmark {
        let timer = TimerRegistry::with_defaults().select().unwrap();
        let opts = BenchmarkOptions::for_timer(&timer);
        let mut b = Benchmark::new(name, Routine::sync(|| {}), opts, timer);
        for &s in samples {
            b.stats.push(s);
        }
        b.hz = if b.stats.mean > 0.0 { 1.0 / b.stats.mean } else { 0.0 };
        b
    }

    #[test]
    fn disjoint_intervals_are_ranked_faster_or_slower() {
        let fast = benchmark_with_samples("fast", &[0.001, 0.0011, 0.0009, 0.001, 0.0011]);
        let slow = benchmark_with_samples("slow", &[0.01, 0.011, 0.009, 0.01, 0.011]);

        assert_eq!(compare(&fast, &slow), Some(Verdict::Faster));
        assert_eq!(compare(&slow, &fast), Some(Verdict::Slower));
    }

    #[test]
    fn overlapping_intervals_are_indistinguishable() {
        let a = benchmark_with_samples("a", &[0.0100, 0.0102, 0.0099, 0.0101, 0.0098]);
        let b = benchmark_with_samples("b", &[0.0101, 0.0100, 0.0103, 0.0099, 0.0102]);
        assert_eq!(compare(&a, &b), Some(Verdict::Indistinguishable));
    }

    #[test]
    fn compare_returns_none_for_an_unsampled_benchmark() {
        let timer = TimerRegistry::with_defaults().select().unwrap();
        let opts = BenchmarkOptions::for_timer(&timer);
        let empty = Benchmark::new("empty", Routine::sync(|| {}), opts, timer);
        let sampled = benchmark_with_samples("sampled", &[0.01, 0.011]);
        assert_eq!(compare(&empty, &sampled), None);
    }

    #[test]
    fn speedup_is_the_ratio_of_rates() {
        let fast = benchmark_with_samples("fast", &[0.001, 0.001, 0.001]);
        let slow = benchmark_with_samples("slow", &[0.01, 0.01, 0.01]);
        let ratio = speedup(&fast, &slow).unwrap();
        assert!((ratio - 10.0).abs() < 1e-6);
    }

    proptest::proptest! {
        /// Swapping subject and reference flips `Faster`/`Slower` and leaves
        /// `Indistinguishable` untouched, for any pair of intervals.
        #[test]
        fn compare_intervals_is_antisymmetric(
            s_mean in 1e-6f64..1.0,
            s_moe in 0.0f64..0.5,
            r_mean in 1e-6f64..1.0,
            r_moe in 0.0f64..0.5,
        ) {
            let forward = compare_intervals(s_mean, s_moe, r_mean, r_moe);
            let backward = compare_intervals(r_mean, r_moe, s_mean, s_moe);
            match forward {
                Verdict::Faster => assert_eq!(backward, Verdict::Slower),
                Verdict::Slower => assert_eq!(backward, Verdict::Faster),
                Verdict::Indistinguishable => assert_eq!(backward, Verdict::Indistinguishable),
            }
        }
    }
}
