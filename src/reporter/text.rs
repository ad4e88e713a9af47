//! Human-readable, colored text reporter.

use std::io::Write;

use crossterm::style::{StyledContent, Stylize};
use itertools::Itertools;
use tabled::builder::Builder;
use tabled::settings::object::{Cell, FirstColumn, FirstRow};
use tabled::settings::themes::Colorization;
use tabled::settings::{Alignment, Color, Margin, Padding, Style};

use crate::compare::Verdict;
use crate::error::ReporterError;
use crate::histogram::PERCENTAGES;
use crate::suite::Suite;

/// Outputs a suite's results as colored, tabular text.
pub struct TextReporter;

trait ReportStyle {
    fn h1(&self) -> StyledContent<&str>;
}

impl<T: AsRef<str>> ReportStyle for T {
    fn h1(&self) -> StyledContent<&str> {
        self.as_ref().bold().underlined().yellow()
    }
}

impl super::SuiteReporter for TextReporter {
    fn print(
        &self,
        w: &mut dyn Write,
        suite: &Suite,
        baseline_deltas: Option<&[(String, Verdict, f64)]>,
    ) -> Result<(), ReporterError> {
        writeln!(w, "{}", suite.name().h1())?;
        writeln!(w)?;

        let mut builder = Builder::default();
        builder.push_record(["Benchmark", "ops/sec", "Mean", "±RME", "Samples"]);
        for b in suite.benchmarks() {
            if b.stats.is_empty() {
                let reason =
                    b.error.as_ref().map(|e| e.to_string()).unwrap_or_else(|| "no samples".to_string());
                builder.push_record([b.name.as_str(), "-", "-", "-", reason.as_str()]);
                continue;
            }
            builder.push_record([
                b.name.as_str(),
                &format!("{:.2}", b.hz),
                &format_seconds(b.stats.mean),
                &format!("±{:.2}%", b.stats.rme),
                &b.stats.len().to_string(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::empty())
            .with(Margin::new(2, 0, 0, 0))
            .with(Padding::new(1, 2, 0, 0))
            .with(Alignment::right())
            .with(Colorization::exact([Color::BOLD], FirstRow))
            .modify(FirstColumn, Alignment::left())
            .modify(Cell::new(0, 0), Alignment::left());
        writeln!(w, "{table}")?;

        for b in suite.benchmarks() {
            if b.stats.histogram.is_empty() {
                continue;
            }
            write!(w, "  {}:", b.name)?;
            for (p, period) in b.stats.histogram.percentiles(PERCENTAGES) {
                write!(w, "  p{p:.0}={}", format_seconds(period.as_secs_f64()))?;
            }
            writeln!(w)?;
        }

        if let Some(deltas) = baseline_deltas {
            writeln!(w)?;
            writeln!(w, "{}", "Baseline comparison".h1())?;
            for (name, verdict, speedup) in deltas {
                let verdict_str = match verdict {
                    Verdict::Faster => format!("{:.2}x faster", speedup).green().to_string(),
                    Verdict::Slower => format!("{:.2}x slower", speedup).red().to_string(),
                    Verdict::Indistinguishable => "no significant change".dim().to_string(),
                };
                writeln!(w, "  {name}: {verdict_str}")?;
            }
        }

        if suite.has_failures() {
            writeln!(w)?;
            writeln!(w, "{}", "Errors".h1())?;
            for b in suite.benchmarks().iter().filter(|b| b.error.is_some()) {
                let err = b.error.as_ref().unwrap();
                writeln!(w, "{}", format!("  {}: {err}", b.name).red())?;
            }
        }

        Ok(())
    }
}

fn format_seconds(secs: f64) -> String {
    if secs < 1e-6 {
        format!("{:.2}ns", secs * 1e9)
    } else if secs < 1e-3 {
        format!("{:.2}µs", secs * 1e6)
    } else if secs < 1.0 {
        format!("{:.2}ms", secs * 1e3)
    } else {
        format!("{:.2}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{BenchmarkOptions, Routine};
    use crate::reporter::SuiteReporter;
    use crate::timer::TimerRegistry;

    #[test]
    fn prints_a_row_per_benchmark() {
        let timer = TimerRegistry::with_defaults().select().unwrap();
        let opts = BenchmarkOptions::for_timer(&timer);
        let mut b = crate::benchmark::Benchmark::new("alpha", Routine::sync(|| {}), opts, timer);
        b.stats.push(0.001);
        b.stats.push(0.0011);
        b.hz = 1.0 / b.stats.mean;

        let mut suite = Suite::new("demo");
        suite.add(b);

        let mut out = Vec::new();
        TextReporter.print(&mut out, &suite, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("alpha"));
        assert!(text.contains("demo"));
    }
}
