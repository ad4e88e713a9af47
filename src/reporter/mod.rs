//! Report formatting and output for completed suites.
//!
//! - [`TextReporter`] — human-readable colored text, ideal for terminals.
//! - [`JsonReporter`] — machine-readable JSON, ideal for CI or tooling.

mod json;
mod text;

pub use json::JsonReporter;
pub use text::TextReporter;

use crate::compare::Verdict;
use crate::error::ReporterError;
use crate::suite::Suite;

/// A trait for formatting and writing a finished suite's results.
pub trait SuiteReporter {
    /// Formats `suite` and writes it to `w`. `baseline_deltas`, if given,
    /// pairs each benchmark name with its comparison against a prior
    /// baseline run (spec's comparison operation applied suite-wide).
    fn print(
        &self,
        w: &mut dyn std::io::Write,
        suite: &Suite,
        baseline_deltas: Option<&[(String, Verdict, f64)]>,
    ) -> Result<(), ReporterError>;
}
