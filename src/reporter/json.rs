//! Machine-readable JSON reporter.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::compare::Verdict;
use crate::error::ReporterError;
use crate::histogram::PERCENTAGES;
use crate::suite::Suite;

/// Outputs a suite's results as pretty-printed JSON.
pub struct JsonReporter;

#[derive(Serialize)]
struct BenchmarkResult {
    hz: f64,
    mean: f64,
    deviation: f64,
    moe: f64,
    rme: f64,
    sample_count: usize,
    cycles: u64,
    percentiles: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct DeltaResult {
    verdict: &'static str,
    speedup: f64,
}

#[derive(Serialize)]
struct Report {
    suite: String,
    benchmarks: BTreeMap<String, BenchmarkResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    baseline_comparison: Option<BTreeMap<String, DeltaResult>>,
}

impl super::SuiteReporter for JsonReporter {
    fn print(
        &self,
        w: &mut dyn Write,
        suite: &Suite,
        baseline_deltas: Option<&[(String, Verdict, f64)]>,
    ) -> Result<(), ReporterError> {
        let benchmarks = suite
            .benchmarks()
            .iter()
            .map(|b| {
                let percentiles = b
                    .stats
                    .histogram
                    .percentiles(PERCENTAGES)
                    .map(|(p, period)| (format!("p{p:.0}"), period.as_secs_f64()))
                    .collect();
                (
                    b.name.clone(),
                    BenchmarkResult {
                        hz: b.hz,
                        mean: b.stats.mean,
                        deviation: b.stats.deviation,
                        moe: b.stats.moe,
                        rme: b.stats.rme,
                        sample_count: b.stats.len(),
                        cycles: b.cycles,
                        percentiles,
                        error: b.error.as_ref().map(|e| e.to_string()),
                    },
                )
            })
            .collect();

        let baseline_comparison = baseline_deltas.map(|deltas| {
            deltas
                .iter()
                .map(|(name, verdict, speedup)| {
                    let verdict = match verdict {
                        Verdict::Faster => "faster",
                        Verdict::Slower => "slower",
                        Verdict::Indistinguishable => "indistinguishable",
                    };
                    (name.clone(), DeltaResult { verdict, speedup: *speedup })
                })
                .collect()
        });

        let report = Report { suite: suite.name().to_string(), benchmarks, baseline_comparison };
        serde_json::to_writer_pretty(&mut *w, &report)?;
        writeln!(w)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{BenchmarkOptions, Routine};
    use crate::reporter::SuiteReporter;
    use crate::timer::TimerRegistry;

    #[test]
    fn prints_valid_json_containing_every_benchmark() {
        let timer = TimerRegistry::with_defaults().select().unwrap();
        let opts = BenchmarkOptions::for_timer(&timer);
        let mut b = crate::benchmark::Benchmark::new("alpha", Routine::sync(|| {}), opts, timer);
        b.stats.push(0.001);
        b.hz = 1.0 / b.stats.mean;

        let mut suite = Suite::new("demo");
        suite.add(b);

        let mut out = Vec::new();
        JsonReporter.print(&mut out, &suite, None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["suite"], "demo");
        assert!(value["benchmarks"]["alpha"]["hz"].is_number());
    }
}
