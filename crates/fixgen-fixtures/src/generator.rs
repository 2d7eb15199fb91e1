//! Building blocks every fixture shares: artifact preparation, parameter
//! registration and dataset submission.

use std::fs;
use std::io;
use std::path::Path;

use fixgen_core::{
    synthesize, DependencyGraph, ParamRole, SampleMode, SynthesizedDataset, ValueKind,
};
use fixgen_storage::{
    ExperimentId, Measurement, MeasurementStore, ParamSpec, RunId, SqliteStore, StorageError,
};
use rand::Rng;

use crate::error::FixtureError;

/// Seed every fixture's generator starts from, so regenerating a fixture
/// yields identical values.
pub const FIXTURE_SEED: u64 = 0;

/// Shape and wiring of one synthesized dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub n_independent: usize,
    pub n_dependent: usize,
    pub shape: Vec<usize>,
    pub mode: SampleMode,
    pub kind: ValueKind,
}

impl DatasetSpec {
    pub fn on_grid(
        n_independent: usize,
        n_dependent: usize,
        shape: &[usize],
        kind: ValueKind,
    ) -> Self {
        DatasetSpec {
            n_independent,
            n_dependent,
            shape: shape.to_vec(),
            mode: SampleMode::OnGrid,
            kind,
        }
    }

    pub fn scattered(
        n_independent: usize,
        n_dependent: usize,
        shape: &[usize],
        kind: ValueKind,
    ) -> Self {
        DatasetSpec {
            n_independent,
            n_dependent,
            shape: shape.to_vec(),
            mode: SampleMode::Scattered,
            kind,
        }
    }

    pub fn graph(&self) -> Result<DependencyGraph, FixtureError> {
        Ok(DependencyGraph::build(self.n_independent, self.n_dependent)?)
    }

    /// Builds the graph and synthesizes one dataset from it.
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(DependencyGraph, SynthesizedDataset), FixtureError> {
        let graph = self.graph()?;
        let data = synthesize(&graph, &self.shape, self.mode, self.kind, rng)?;
        Ok((graph, data))
    }
}

/// Creates the artifact's directory and removes a stale artifact.
pub fn prepare_artifact(path: &Path) -> Result<(), FixtureError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| FixtureError::io(parent, e))?;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale artifact");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FixtureError::io(path, e)),
    }
}

/// Prepares `path` and opens a fresh store on it at `level`.
pub fn fresh_store(path: &Path, level: u32) -> Result<SqliteStore, FixtureError> {
    prepare_artifact(path)?;
    Ok(SqliteStore::connect(path, level)?)
}

/// Registers every parameter of `graph`, dependents with their full
/// independent set as setpoints.
///
/// Labels and units are derived from the parameter names.
pub fn register_graph(
    measurement: &mut Measurement,
    graph: &DependencyGraph,
    kind: ValueKind,
) -> Result<(), StorageError> {
    let setpoints: Vec<&str> = graph.independents().map(|n| n.as_str()).collect();
    for name in graph.independents() {
        measurement.register_parameter(labelled(name.as_str(), kind, ParamRole::Independent))?;
    }
    for name in graph.dependents() {
        let spec = labelled(name.as_str(), kind, ParamRole::Dependent)
            .depending_on(setpoints.iter().copied());
        measurement.register_parameter(spec)?;
    }
    Ok(())
}

fn labelled(name: &str, kind: ValueKind, role: ParamRole) -> ParamSpec {
    let label = match role {
        ParamRole::Independent => format!("Setpoint {name}"),
        ParamRole::Dependent => format!("Measured {name}"),
    };
    ParamSpec::new(name, kind).with_label(label, "a.u.")
}

/// Submits `data` as one run of `measurement`.
pub fn submit_dataset<S: MeasurementStore>(
    store: &mut S,
    exp: ExperimentId,
    measurement: &Measurement,
    data: &SynthesizedDataset,
    snapshot: Option<&serde_json::Value>,
) -> Result<RunId, FixtureError> {
    store.run(exp, measurement, snapshot, |saver| {
        let values: Vec<(&str, _)> = data
            .pairs()
            .map(|(name, values)| (name.as_str(), values))
            .collect();
        saver.add_result(&values)?;
        Ok::<_, FixtureError>(())
    })
}

/// Registers a fresh measurement for `spec`, synthesizes a dataset and
/// submits it as one run.
pub fn generate_run<S: MeasurementStore, R: Rng + ?Sized>(
    store: &mut S,
    exp: ExperimentId,
    spec: &DatasetSpec,
    rng: &mut R,
) -> Result<RunId, FixtureError> {
    let (graph, data) = spec.synthesize(rng)?;
    let mut measurement = Measurement::new();
    register_graph(&mut measurement, &graph, spec.kind)?;
    submit_dataset(store, exp, &measurement, &data, None)
}
