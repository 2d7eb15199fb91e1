//! Which fixtures each version produces, and at which schema level.

use std::path::{Path, PathBuf};

use fixgen_checkout::{Generator, VersionId};
use fixgen_storage::LATEST_LEVEL;

use crate::error::FixtureError;
use crate::manifest::{ArtifactRecord, FixtureManifest};
use crate::scenario::{version_dir, Scenario};

/// The label of the bug-fix snapshot that still writes schema level 3.
const RUN_DESCRIPTION_BUG_LABEL: &str = "4a";

/// Ordered scenarios for `version`.
pub fn scenarios_for(version: &VersionId) -> Result<Vec<Scenario>, FixtureError> {
    let scenarios = match version {
        VersionId::Number(3) => vec![
            Scenario::Empty,
            Scenario::RunsWithoutRunDescription,
            Scenario::SomeRuns,
            Scenario::UpgradedFrom(VersionId::Number(2)),
        ],
        VersionId::Number(4) => vec![
            Scenario::Empty,
            Scenario::RunsWithoutSnapshots,
            Scenario::RunsWithSnapshots,
        ],
        VersionId::Number(_) => vec![Scenario::Empty, Scenario::SomeRuns],
        VersionId::Label(label) if label == RUN_DESCRIPTION_BUG_LABEL => {
            vec![Scenario::Empty, Scenario::SomeRuns]
        }
        VersionId::Label(_) => return Err(FixtureError::NoCatalog(version.clone())),
    };
    Ok(scenarios)
}

/// Storage schema level the snapshot for `version` writes.
pub fn schema_level(version: &VersionId) -> Result<u32, FixtureError> {
    match version {
        VersionId::Number(n) if *n <= LATEST_LEVEL => Ok(*n),
        VersionId::Label(label) if label == RUN_DESCRIPTION_BUG_LABEL => Ok(3),
        _ => Err(FixtureError::NoCatalog(version.clone())),
    }
}

/// Every artifact one version produces, laid out under a fixture root.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    version: VersionId,
    level: u32,
    fixture_dir: PathBuf,
    scenarios: Vec<Scenario>,
}

impl FixtureSet {
    /// The catalog entry for `version` rooted at `fixture_dir`.
    pub fn for_version(
        version: VersionId,
        fixture_dir: impl Into<PathBuf>,
    ) -> Result<Self, FixtureError> {
        let scenarios = scenarios_for(&version)?;
        let level = schema_level(&version)?;
        Ok(FixtureSet {
            version,
            level,
            fixture_dir: fixture_dir.into(),
            scenarios,
        })
    }

    pub fn version(&self) -> &VersionId {
        &self.version
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// `<fixture_dir>/version<id>`.
    pub fn version_dir(&self) -> PathBuf {
        version_dir(&self.fixture_dir, &self.version)
    }

    pub fn artifact_path(&self, scenario: &Scenario) -> PathBuf {
        self.version_dir().join(scenario.file_name())
    }

    /// One generator per scenario, in catalog order.
    pub fn generators(&self) -> Vec<Generator<'_>> {
        self.scenarios
            .iter()
            .map(|scenario| {
                let path = self.artifact_path(scenario);
                let level = self.level;
                let fixture_dir: &Path = &self.fixture_dir;
                Generator::new(scenario.to_string(), move || {
                    scenario
                        .generate(&path, level, fixture_dir)
                        .map_err(Into::into)
                })
            })
            .collect()
    }

    /// Hashes every artifact into a manifest.
    pub fn manifest(&self, snapshot_ref: Option<&str>) -> Result<FixtureManifest, FixtureError> {
        let artifacts = self
            .scenarios
            .iter()
            .map(|scenario| {
                ArtifactRecord::hash(&scenario.to_string(), &self.artifact_path(scenario))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FixtureManifest {
            version: self.version.clone(),
            schema_level: self.level,
            snapshot_ref: snapshot_ref.map(str::to_string),
            artifacts,
        })
    }

    /// Writes the manifest next to the artifacts.
    pub fn write_manifest(&self, snapshot_ref: Option<&str>) -> Result<PathBuf, FixtureError> {
        self.manifest(snapshot_ref)?.write_to(&self.version_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(version: VersionId) -> Vec<String> {
        scenarios_for(&version)
            .unwrap()
            .iter()
            .map(Scenario::to_string)
            .collect()
    }

    #[test]
    fn versions_map_to_their_scenarios() {
        for n in 0..3 {
            assert_eq!(names(VersionId::Number(n)), ["empty", "some_runs"]);
        }
        assert_eq!(
            names(VersionId::Number(3)),
            ["empty", "runs_without_run_description", "some_runs", "upgraded_from_2"]
        );
        assert_eq!(names("4a".into()), ["empty", "some_runs"]);
        assert_eq!(
            names(VersionId::Number(4)),
            ["empty", "runs_without_snapshots", "runs_with_snapshots"]
        );
        assert_eq!(names(VersionId::Number(5)), ["empty", "some_runs"]);
    }

    #[test]
    fn unknown_labels_have_no_catalog() {
        let err = scenarios_for(&"9z".into()).unwrap_err();
        assert!(matches!(err, FixtureError::NoCatalog(_)));
    }

    #[test]
    fn levels_follow_versions() {
        assert_eq!(schema_level(&VersionId::Number(2)).unwrap(), 2);
        assert_eq!(schema_level(&"4a".into()).unwrap(), 3);
        assert!(schema_level(&VersionId::Number(LATEST_LEVEL + 1)).is_err());
    }

    #[test]
    fn artifacts_live_under_the_version_directory() {
        let set = FixtureSet::for_version(VersionId::Number(3), "db_files").unwrap();
        assert_eq!(
            set.artifact_path(&Scenario::UpgradedFrom(VersionId::Number(2))),
            Path::new("db_files/version3/some_runs_upgraded_2.db")
        );
        let names: Vec<String> = set.generators().iter().map(|g| g.name().to_string()).collect();
        assert_eq!(names.len(), 4);
        assert_eq!(names[3], "upgraded_from_2");
    }

    #[test]
    fn generators_write_every_artifact_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let set = FixtureSet::for_version(VersionId::Number(1), dir.path()).unwrap();
        for generator in set.generators() {
            generator.invoke().unwrap();
        }
        let path = set.write_manifest(Some("abc123")).unwrap();
        assert_eq!(path, set.version_dir().join("manifest.json"));
        let manifest = FixtureManifest::read(&path).unwrap();
        assert_eq!(manifest.artifacts.len(), 2);
        assert_eq!(manifest.schema_level, 1);
        assert!(manifest.artifacts.iter().all(|a| a.bytes > 0));
    }
}
