//! The fixture scenarios: what each artifact contains and how it is checked.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use fixgen_checkout::VersionId;
use fixgen_core::ValueKind;
use fixgen_storage::{Measurement, MeasurementStore, RunDescription, RunId, SqliteStore};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rusqlite::params;
use serde_json::json;

use crate::error::FixtureError;
use crate::generator::{
    fresh_store, prepare_artifact, register_graph, submit_dataset, DatasetSpec, FIXTURE_SEED,
};

const EXPERIMENT: &str = "experiment_1";
const SAMPLE: &str = "no_sample_1";

/// One fixture artifact a version can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// A database with the schema and nothing else.
    Empty,
    /// Ten identical runs of two setpoints and one measured parameter.
    SomeRuns,
    /// Runs whose stored description is valid, NULL, empty, and NULL for a
    /// run without parameters.
    RunsWithoutRunDescription,
    /// Another version's `some_runs.db`, upgraded in place to this level.
    UpgradedFrom(VersionId),
    /// Runs without snapshots; the snapshot column must never appear.
    RunsWithoutSnapshots,
    /// Runs with a populated snapshot, an empty-station snapshot, and none.
    RunsWithSnapshots,
}

impl Scenario {
    pub fn file_name(&self) -> String {
        match self {
            Scenario::Empty => "empty.db".to_string(),
            Scenario::SomeRuns => "some_runs.db".to_string(),
            Scenario::RunsWithoutRunDescription => {
                "some_runs_without_run_description.db".to_string()
            }
            Scenario::UpgradedFrom(from) => format!("some_runs_upgraded_{from}.db"),
            Scenario::RunsWithoutSnapshots => "with_runs_but_no_snapshots.db".to_string(),
            Scenario::RunsWithSnapshots => "with_runs_and_snapshots.db".to_string(),
        }
    }

    /// Short name used in logs and manifests.
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Empty => "empty",
            Scenario::SomeRuns => "some_runs",
            Scenario::RunsWithoutRunDescription => "runs_without_run_description",
            Scenario::UpgradedFrom(_) => "upgraded",
            Scenario::RunsWithoutSnapshots => "runs_without_snapshots",
            Scenario::RunsWithSnapshots => "runs_with_snapshots",
        }
    }

    /// Writes this scenario to `path` at schema `level`.
    ///
    /// `fixture_dir` is the root holding every version's artifacts, used to
    /// locate upstream artifacts.
    pub fn generate(
        &self,
        path: &Path,
        level: u32,
        fixture_dir: &Path,
    ) -> Result<(), FixtureError> {
        match self {
            Scenario::Empty => empty(path, level),
            Scenario::SomeRuns => some_runs(path, level),
            Scenario::RunsWithoutRunDescription => runs_without_run_description(path, level),
            Scenario::UpgradedFrom(from) => upgraded_from(from, path, level, fixture_dir),
            Scenario::RunsWithoutSnapshots => runs_without_snapshots(path, level),
            Scenario::RunsWithSnapshots => runs_with_snapshots(path, level),
        }?;
        tracing::info!(scenario = self.name(), path = %path.display(), level, "wrote fixture");
        Ok(())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::UpgradedFrom(from) => write!(f, "upgraded_from_{from}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Directory holding one version's artifacts under `fixture_dir`.
pub fn version_dir(fixture_dir: &Path, version: &VersionId) -> PathBuf {
    fixture_dir.join(format!("version{version}"))
}

fn ensure(
    condition: bool,
    scenario: &'static str,
    message: impl Into<String>,
) -> Result<(), FixtureError> {
    if condition {
        Ok(())
    } else {
        Err(FixtureError::Assertion {
            scenario,
            message: message.into(),
        })
    }
}

fn ensure_run_ids(
    store: &SqliteStore,
    scenario: &'static str,
    expected: &[i64],
) -> Result<(), FixtureError> {
    let ids: Vec<i64> = store.run_ids()?.into_iter().map(|RunId(id)| id).collect();
    ensure(
        ids == expected,
        scenario,
        format!("run ids are {ids:?}, expected {expected:?}"),
    )
}

fn empty(path: &Path, level: u32) -> Result<(), FixtureError> {
    fresh_store(path, level)?;
    Ok(())
}

fn some_runs(path: &Path, level: u32) -> Result<(), FixtureError> {
    let mut store = fresh_store(path, level)?;
    let exp = store.new_experiment(EXPERIMENT, SAMPLE)?;
    let mut rng = ChaCha8Rng::seed_from_u64(FIXTURE_SEED);

    let spec = DatasetSpec::on_grid(2, 1, &[10, 10], ValueKind::Numeric);
    let graph = spec.graph()?;
    let mut measurement = Measurement::new();
    register_graph(&mut measurement, &graph, spec.kind)?;

    for _ in 0..10 {
        let (_, data) = spec.synthesize(&mut rng)?;
        submit_dataset(&mut store, exp, &measurement, &data, None)?;
    }
    Ok(())
}

const SET_RUN_DESCRIPTION: &str = "UPDATE runs SET run_description = ?1 WHERE run_id = ?2";

fn runs_without_run_description(path: &Path, level: u32) -> Result<(), FixtureError> {
    const SCENARIO: &str = "runs_without_run_description";

    let mut store = fresh_store(path, level)?;
    ensure(
        store.is_column_in_table("runs", "run_description")?,
        SCENARIO,
        format!("schema level {level} has no run_description column"),
    )?;
    let exp = store.new_experiment(EXPERIMENT, SAMPLE)?;
    let mut rng = ChaCha8Rng::seed_from_u64(FIXTURE_SEED);

    let spec = DatasetSpec::on_grid(2, 1, &[10, 10], ValueKind::Numeric);
    let graph = spec.graph()?;
    let mut measurement = Measurement::new();
    register_graph(&mut measurement, &graph, spec.kind)?;

    for _ in 0..3 {
        let (_, data) = spec.synthesize(&mut rng)?;
        submit_dataset(&mut store, exp, &measurement, &data, None)?;
    }
    ensure_run_ids(&store, SCENARIO, &[1, 2, 3])?;

    store.execute(SET_RUN_DESCRIPTION, params![None::<String>, 2])?;
    store.commit()?;
    let empty = RunDescription::empty().to_json()?;
    store.execute(SET_RUN_DESCRIPTION, params![empty, 3])?;
    store.commit()?;

    let no_params = Measurement::new();
    store.run(exp, &no_params, None, |_| Ok::<_, FixtureError>(()))?;
    ensure_run_ids(&store, SCENARIO, &[1, 2, 3, 4])?;

    store.execute(SET_RUN_DESCRIPTION, params![None::<String>, 4])?;
    store.commit()?;
    Ok(())
}

fn upgraded_from(
    from: &VersionId,
    path: &Path,
    level: u32,
    fixture_dir: &Path,
) -> Result<(), FixtureError> {
    let source = version_dir(fixture_dir, from).join(Scenario::SomeRuns.file_name());
    if !source.is_file() {
        return Err(FixtureError::MissingUpstream {
            version: from.clone(),
            path: source,
        });
    }
    prepare_artifact(path)?;
    fs::copy(&source, path).map_err(|e| FixtureError::io(path, e))?;
    let store = SqliteStore::connect(path, level)?;
    tracing::debug!(
        from = %source.display(),
        to = store.user_version()?,
        "upgraded copied artifact"
    );
    Ok(())
}

fn runs_without_snapshots(path: &Path, level: u32) -> Result<(), FixtureError> {
    const SCENARIO: &str = "runs_without_snapshots";

    let mut store = fresh_store(path, level)?;
    let exp = store.new_experiment(EXPERIMENT, SAMPLE)?;
    ensure(
        !store.is_column_in_table("runs", "snapshot")?,
        SCENARIO,
        "snapshot column present before any run",
    )?;
    let mut rng = ChaCha8Rng::seed_from_u64(FIXTURE_SEED);

    let spec = DatasetSpec::on_grid(2, 1, &[4, 4], ValueKind::Numeric);
    let graph = spec.graph()?;
    let mut measurement = Measurement::new();
    register_graph(&mut measurement, &graph, spec.kind)?;

    for _ in 0..4 {
        let (_, data) = spec.synthesize(&mut rng)?;
        submit_dataset(&mut store, exp, &measurement, &data, None)?;
    }
    ensure(
        !store.is_column_in_table("runs", "snapshot")?,
        SCENARIO,
        "snapshot column appeared although no run carried a snapshot",
    )
}

fn runs_with_snapshots(path: &Path, level: u32) -> Result<(), FixtureError> {
    const SCENARIO: &str = "runs_with_snapshots";

    let mut store = fresh_store(path, level)?;
    let exp = store.new_experiment(EXPERIMENT, SAMPLE)?;
    let mut rng = ChaCha8Rng::seed_from_u64(FIXTURE_SEED);

    let spec = DatasetSpec::on_grid(2, 1, &[4, 4], ValueKind::Numeric);
    let graph = spec.graph()?;
    let mut measurement = Measurement::new();
    register_graph(&mut measurement, &graph, spec.kind)?;

    let full_station = json!({
        "station": {
            "instruments": {},
            "parameters": {
                "param_0": {
                    "name": "param_0",
                    "label": "Setpoint param_0",
                    "unit": "a.u.",
                    "value": 0.0
                }
            },
            "components": {},
            "config": null
        }
    });
    let empty_station = json!({
        "station": {
            "instruments": {},
            "parameters": {},
            "components": {},
            "config": null
        }
    });

    for snapshot in [Some(&full_station), Some(&empty_station), None] {
        let (_, data) = spec.synthesize(&mut rng)?;
        submit_dataset(&mut store, exp, &measurement, &data, snapshot)?;
    }
    ensure_run_ids(&store, SCENARIO, &[1, 2, 3])?;
    ensure(
        store.is_column_in_table("runs", "snapshot")?,
        SCENARIO,
        "snapshot column missing after runs with snapshots",
    )
}
