//! Error types for the measurement core and its ambient collaborators.

use thiserror::Error;

/// Errors raised while selecting or probing a [`crate::timer::Timer`].
#[derive(Debug, Error)]
pub enum TimerError {
    /// Every registered time source probed as broken (non-positive deltas only).
    #[error("no usable timer: every candidate time source reported a non-positive resolution")]
    NoUsableTimer,
}

/// Errors raised by the clock loop, cycle controller, and deferred protocol.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The benchmark routine is a known no-op marker (see `Benchmark::noop`).
    #[error("benchmark body is empty")]
    EmptyBody,

    /// The untimed pre-test call panicked.
    #[error("pre-test call panicked: {0}")]
    PreTestPanicked(String),

    /// The routine panicked during the timed batch.
    #[error("benchmark body panicked during run: {0}")]
    BodyThrewInRun(String),

    /// Neither the inlined nor the indirect-call batch shape could be compiled.
    #[error("compilation refused: no usable batch shape for this routine")]
    CompilationRefused,

    /// A deferred batch's stop closure was never invoked.
    #[error("timer stop was never invoked for this deferred batch")]
    TimerStopFailed,

    /// `DeferredContext::resolve` was called a second time for the same cycle.
    #[error("deferred context resolved more than once in the same cycle")]
    DeferredDoubleResolve,

    /// Per-iteration time fell below timer resolution even after exhausting the
    /// cycle-5 fallback iteration count.
    #[error("unclockable rate: per-iteration time is indistinguishable from timer noise")]
    UnclockableRate,

    /// `min_samples` was reached but `max_time` elapsed before the confidence
    /// target was met. Benign: the sampling controller stops with whatever
    /// statistics it has accumulated.
    #[error("exceeded time budget before reaching desired confidence")]
    ExceededBudget,

    /// No usable timer was available for the measurement core.
    #[error(transparent)]
    Timer(#[from] TimerError),
}

/// Errors raised while loading or saving a baseline report.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// Failed to open a baseline file for reading.
    #[error("failed to open baseline at {path}: {source}")]
    Open { path: std::path::PathBuf, source: std::io::Error },

    /// Failed to parse a baseline file as JSON.
    #[error("failed to parse baseline at {path}: {source}")]
    Parse { path: std::path::PathBuf, source: serde_json::Error },

    /// Failed to create the baseline directory.
    #[error("failed to create baseline directory {dir}: {source}")]
    CreateDir { dir: std::path::PathBuf, source: std::io::Error },

    /// Failed to create a temporary file for an atomic write.
    #[error("failed to create temporary baseline file at {path}: {source}")]
    CreateTemp { path: std::path::PathBuf, source: std::io::Error },

    /// Failed to serialize the baseline to the temporary file.
    #[error("failed to serialize baseline to {path}: {source}")]
    Serialize { path: std::path::PathBuf, source: serde_json::Error },

    /// Failed to flush the temporary file.
    #[error("failed to flush baseline file at {path}: {source}")]
    Flush { path: std::path::PathBuf, source: std::io::Error },

    /// Failed to rename the temporary file into place.
    #[error("failed to rename baseline file from {from} to {to}: {source}")]
    Rename { from: std::path::PathBuf, to: std::path::PathBuf, source: std::io::Error },
}

/// Errors raised while formatting and writing a report.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// Writing to the output sink failed.
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the report to JSON failed.
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the measurement core.
pub type Result<T, E = BenchError> = std::result::Result<T, E>;
