//! Benchmark databases: many runs of one large synthesized dataset.
//!
//! Each run registers a fresh measurement, synthesizes its data and submits
//! it; the wall time of that whole sequence is what gets reported.

use std::path::{Path, PathBuf};
use std::time::Instant;

use fixgen_core::ValueKind;
use fixgen_storage::{MeasurementStore, LATEST_LEVEL};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::FixtureError;
use crate::generator::{fresh_store, generate_run, DatasetSpec, FIXTURE_SEED};

pub const DEFAULT_RUNS: usize = 100;

/// How many of the first and last run times the summary keeps.
const EDGE_SAMPLES: usize = 5;

/// One benchmark database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkCase {
    pub file_name: &'static str,
    pub dataset: DatasetSpec,
}

/// The four standard cases.
pub fn standard_cases() -> Vec<BenchmarkCase> {
    vec![
        BenchmarkCase {
            file_name: "benchmark_1d.db",
            dataset: DatasetSpec::on_grid(1, 1, &[1000], ValueKind::Array),
        },
        BenchmarkCase {
            file_name: "benchmark_2d_on_grid.db",
            dataset: DatasetSpec::on_grid(2, 1, &[100, 100], ValueKind::Numeric),
        },
        BenchmarkCase {
            file_name: "benchmark_2d_on_grid_array.db",
            dataset: DatasetSpec::on_grid(2, 1, &[100, 100], ValueKind::Array),
        },
        BenchmarkCase {
            file_name: "benchmark_2d_scatter.db",
            dataset: DatasetSpec::scattered(2, 1, &[10000], ValueKind::Array),
        },
    ]
}

/// Per-run wall times in seconds, summarized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSummary {
    pub first: Vec<f64>,
    pub last: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

impl TimingSummary {
    /// `None` when there are no times to summarize.
    pub fn from_times(times: &[f64]) -> Option<Self> {
        if times.is_empty() {
            return None;
        }
        let tail = times.len().saturating_sub(EDGE_SAMPLES);
        Some(TimingSummary {
            first: times.iter().take(EDGE_SAMPLES).copied().collect(),
            last: times[tail..].to_vec(),
            min: times.iter().copied().fold(f64::INFINITY, f64::min),
            max: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub path: PathBuf,
    pub runs: usize,
    pub timing: TimingSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub cases: Vec<CaseReport>,
}

/// Writes every standard case into `out_dir` with `runs` runs each.
pub fn run_benchmarks(out_dir: &Path, runs: usize) -> Result<BenchmarkReport, FixtureError> {
    let cases = standard_cases()
        .iter()
        .map(|case| run_case(out_dir, case, runs))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BenchmarkReport { cases })
}

/// Writes one case, replacing any earlier database of the same name.
pub fn run_case(
    out_dir: &Path,
    case: &BenchmarkCase,
    runs: usize,
) -> Result<CaseReport, FixtureError> {
    if runs == 0 {
        return Err(FixtureError::NoBenchmarkRuns);
    }
    let path = out_dir.join(case.file_name);
    let mut store = fresh_store(&path, LATEST_LEVEL)?;
    let exp = store.new_experiment("benchmarks", "no_sample")?;
    let mut rng = ChaCha8Rng::seed_from_u64(FIXTURE_SEED);

    let mut times = Vec::with_capacity(runs);
    for _ in 0..runs {
        let start = Instant::now();
        generate_run(&mut store, exp, &case.dataset, &mut rng)?;
        times.push(start.elapsed().as_secs_f64());
    }

    let timing = TimingSummary::from_times(&times).ok_or(FixtureError::NoBenchmarkRuns)?;
    tracing::info!(
        case = case.file_name,
        runs,
        min = timing.min,
        max = timing.max,
        "benchmark case written"
    );
    Ok(CaseReport { path, runs, timing })
}
