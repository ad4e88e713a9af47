//! Command-line interface. Embed [`BenchCli`] into your own CLI struct via
//! `#[command(flatten)]`, or call [`run`] directly with a [`Suite`] you built.
//!
//! ```no_run
//! use clap::Parser;
//! use ratebench::cli::BenchCli;
//!
//! #[derive(Parser)]
//! struct Opts {
//!     #[command(flatten)]
//!     bench: BenchCli,
//! }
//! ```

use std::io::stdout;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;

use crate::baseline::{self, Baseline, BaselineName};
use crate::benchmark::BenchmarkOptions;
use crate::compare::{Verdict, compare_intervals};
use crate::reporter::{JsonReporter, SuiteReporter, TextReporter};
use crate::suite::Suite;

/// Shared benchmark CLI options.
#[derive(Parser, Clone, Debug)]
#[allow(missing_docs)]
pub struct BenchCli {
    /// Minimum number of samples to collect per benchmark
    #[clap(long, default_value = "5")]
    pub min_samples: NonZeroU64,

    /// Target per-cycle measurement duration
    #[clap(long)]
    pub min_time: Option<humantime::Duration>,

    /// Total measurement time budget per benchmark
    #[clap(long)]
    pub max_time: Option<humantime::Duration>,

    /// Run every benchmark in the suite concurrently instead of in sequence
    #[clap(long)]
    pub concurrent: bool,

    /// Suppress the printed report
    #[clap(long, short = 'q')]
    pub quiet: bool,

    /// Output format for the report
    #[clap(short, long, value_enum, default_value_t = ReportFormat::Text, ignore_case = true)]
    pub output: ReportFormat,

    /// Save this run's results as a named baseline after reporting
    #[clap(long)]
    pub save_baseline: Option<String>,

    /// Compare this run's results against a previously saved baseline
    #[clap(long)]
    pub baseline: Option<String>,

    /// Directory baselines are read from and written to
    #[clap(long)]
    pub baseline_dir: Option<PathBuf>,
}

impl BenchCli {
    /// Overrides the relevant fields of `options` from the parsed flags.
    pub fn apply(&self, options: &mut BenchmarkOptions) {
        options.min_samples = self.min_samples.get();
        if let Some(d) = self.min_time {
            options.min_time = d.as_secs_f64();
        }
        if let Some(d) = self.max_time {
            options.max_time = d.as_secs_f64();
        }
        options.async_mode = self.concurrent;
    }
}

/// Benchmark report output format.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ReportFormat {
    /// Plain, colored text. See [`TextReporter`].
    Text,
    /// Pretty-printed JSON. See [`JsonReporter`].
    Json,
}

/// Runs `suite` under the options in `cli`, prints a report, and handles
/// baseline comparison/save (spec ambient CLI surface — mirrors the
/// teacher's `cli::run<BS>` wiring).
///
/// A `Ctrl-C` during the run cancels every still-running benchmark rather
/// than killing the process outright, so partial results still get
/// reported, matching the teacher's own `cancel`/`ctrl_c` wiring in its
/// silent collector.
pub async fn run(cli: &BenchCli, mut suite: Suite) -> anyhow::Result<()> {
    if cli.concurrent {
        suite = suite.concurrently();
    }
    for benchmark in suite.benchmarks_mut() {
        cli.apply(&mut benchmark.options);
    }

    let cancel = CancellationToken::new();
    let aborted = Arc::new(AtomicBool::new(false));
    let watcher = {
        let cancel = cancel.clone();
        let aborted = aborted.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    aborted.store(true, Ordering::SeqCst);
                }
                _ = cancel.cancelled() => {}
            }
        })
    };

    suite.run_with_abort(aborted).await;
    cancel.cancel();
    let _ = watcher.await;

    let baseline_dir = baseline::resolve_baseline_dir(cli.baseline_dir.as_deref());

    let deltas = match &cli.baseline {
        Some(name) => {
            let name: BaselineName = name.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let prior = baseline::load(&baseline_dir, &name)?;
            Some(build_deltas(&suite, &prior))
        }
        None => None,
    };

    if !cli.quiet {
        let reporter: &dyn SuiteReporter = match cli.output {
            ReportFormat::Text => &TextReporter,
            ReportFormat::Json => &JsonReporter,
        };
        reporter.print(&mut stdout(), &suite, deltas.as_deref())?;
    }

    if let Some(name) = &cli.save_baseline {
        let name: BaselineName = name.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        let snapshot = Baseline::from_suite(&suite);
        baseline::save(&baseline_dir, &name, &snapshot)?;
    }

    Ok(())
}

fn build_deltas(suite: &Suite, prior: &Baseline) -> Vec<(String, Verdict, f64)> {
    suite
        .benchmarks()
        .iter()
        .filter(|b| !b.stats.is_empty())
        .filter_map(|b| {
            let prior_summary = prior.benchmarks.get(&b.name)?;
            let verdict = compare_intervals(b.stats.mean, b.stats.moe, prior_summary.mean, prior_summary.moe);
            let speedup = if prior_summary.hz > 0.0 { b.hz / prior_summary.hz } else { 0.0 };
            Some((b.name.clone(), verdict, speedup))
        })
        .collect()
}
