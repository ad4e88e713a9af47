//! Baseline persistence: saves a suite's measured rates so a later run can
//! be compared against them. Consolidated from the teacher's separate
//! `baseline/{mod,storage}.rs` into one file since this crate's baseline
//! shape (a flat list of named rates) needs none of the teacher's
//! concurrency/latency-histogram bookkeeping.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BaselineError;
use crate::suite::Suite;

/// Current schema version for baseline files.
const SCHEMA_VERSION: u32 = 1;

/// A validated baseline name: `[a-zA-Z0-9_.-]+`, rejecting path separators
/// and empty strings so it is always safe to use as a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineName(String);

impl BaselineName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BaselineName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("baseline name cannot be empty".to_string());
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.') {
            return Err(format!("invalid baseline name '{s}': must contain only [a-zA-Z0-9_.-]"));
        }
        Ok(BaselineName(s.to_string()))
    }
}

impl std::fmt::Display for BaselineName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single benchmark's persisted statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineSummary {
    pub name: String,
    pub hz: f64,
    pub mean: f64,
    pub deviation: f64,
    pub moe: f64,
    pub rme: f64,
    pub sample_count: usize,
    pub cycles: u64,
}

/// A saved snapshot of a suite's results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub ratebench_version: String,
    pub suite_name: String,
    pub benchmarks: BTreeMap<String, BaselineSummary>,
}

impl Baseline {
    /// Builds a baseline snapshot from a suite that has already been run.
    /// Benchmarks that never completed sampling (`stats` empty) are skipped.
    pub fn from_suite(suite: &Suite) -> Self {
        let benchmarks = suite
            .benchmarks()
            .iter()
            .filter(|b| !b.stats.is_empty())
            .map(|b| {
                (
                    b.name.clone(),
                    BaselineSummary {
                        name: b.name.clone(),
                        hz: b.hz,
                        mean: b.stats.mean,
                        deviation: b.stats.deviation,
                        moe: b.stats.moe,
                        rme: b.stats.rme,
                        sample_count: b.stats.len(),
                        cycles: b.cycles,
                    },
                )
            })
            .collect();

        Baseline {
            schema_version: SCHEMA_VERSION,
            created_at: Utc::now(),
            ratebench_version: env!("CARGO_PKG_VERSION").to_string(),
            suite_name: suite.name().to_string(),
            benchmarks,
        }
    }
}

/// Resolves the baseline directory: an explicit CLI flag, then
/// `RATEBENCH_BASELINE_DIR`, then `${CARGO_TARGET_DIR}/ratebench/baselines`,
/// then `target/ratebench/baselines` (spec §9 ambient-stack expansion,
/// grounded on the teacher's `resolve_baseline_dir`).
pub fn resolve_baseline_dir(cli_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = cli_dir {
        return dir.to_path_buf();
    }
    std::env::var("RATEBENCH_BASELINE_DIR")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("CARGO_TARGET_DIR").map(|d| PathBuf::from(d).join("ratebench/baselines")))
        .unwrap_or_else(|_| PathBuf::from("target/ratebench/baselines"))
}

/// Loads a baseline by name from `baseline_dir`.
pub fn load(baseline_dir: &Path, name: &BaselineName) -> Result<Baseline, BaselineError> {
    let path = baseline_dir.join(format!("{name}.json"));
    let file =
        File::open(&path).map_err(|e| BaselineError::Open { path: path.clone(), source: e })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| BaselineError::Parse { path, source: e })
}

/// Saves `baseline` under `name` in `baseline_dir`, atomically (write to a
/// temp file, flush, then rename over the target path).
pub fn save(baseline_dir: &Path, name: &BaselineName, baseline: &Baseline) -> Result<(), BaselineError> {
    fs::create_dir_all(baseline_dir)
        .map_err(|e| BaselineError::CreateDir { dir: baseline_dir.to_path_buf(), source: e })?;

    let path = baseline_dir.join(format!("{name}.json"));
    let temp_path = baseline_dir.join(format!("{name}.json.tmp"));

    {
        let file = File::create(&temp_path)
            .map_err(|e| BaselineError::CreateTemp { path: temp_path.clone(), source: e })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, baseline)
            .map_err(|e| BaselineError::Serialize { path: temp_path.clone(), source: e })?;
        writer
            .flush()
            .map_err(|e| BaselineError::Flush { path: temp_path.clone(), source: e })?;
    }

    fs::rename(&temp_path, &path)
        .map_err(|e| BaselineError::Rename { from: temp_path, to: path, source: e })
}
