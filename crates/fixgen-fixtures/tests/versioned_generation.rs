//! Fixture generation under a git checkout.

use std::fs;
use std::path::{Path, PathBuf};

use fixgen_checkout::{
    CheckoutController, CheckoutError, Generator, GitTree, VersionEntry, VersionId,
    VersionRegistry,
};
use fixgen_core::ValueKind;
use fixgen_fixtures::generator::{fresh_store, generate_run};
use fixgen_fixtures::{DatasetSpec, FixtureError, FixtureManifest, FixtureSet};
use fixgen_storage::{MeasurementStore, SqliteStore};
use git2::{Oid, Repository, RepositoryInitOptions, Signature};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

struct Workspace {
    dir: tempfile::TempDir,
    snapshot: Oid,
    tip: Oid,
}

impl Workspace {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn fixture_dir(&self) -> PathBuf {
        self.root().join("tests").join("fixtures").join("db_files")
    }

    fn registry(&self) -> VersionRegistry {
        let snapshot = self.snapshot.to_string();
        VersionRegistry::from_entries([
            VersionEntry::new(VersionId::Number(2), &snapshot, "indices"),
            VersionEntry::new(VersionId::Number(3), &snapshot, "run description"),
            VersionEntry::new(VersionId::Number(4), &snapshot, "snapshots"),
        ])
        .unwrap()
    }

    fn controller(&self) -> CheckoutController<GitTree> {
        let tree = GitTree::open(self.root()).unwrap();
        CheckoutController::new(tree, self.registry(), self.root())
    }

    fn head(&self) -> (bool, Oid) {
        let repo = Repository::open(self.root()).unwrap();
        let detached = repo.head_detached().unwrap();
        let commit = repo.head().unwrap().peel_to_commit().unwrap().id();
        (detached, commit)
    }
}

fn commit(repo: &Repository, contents: &str) -> Oid {
    let root = repo.workdir().unwrap().to_path_buf();
    fs::write(root.join("host.txt"), contents).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("host.txt")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("fixgen", "fixgen@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, contents, &tree, &parents)
        .unwrap()
}

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir.path(), &opts).unwrap();
    let snapshot = commit(&repo, "old host");
    let tip = commit(&repo, "new host");
    Workspace { dir, snapshot, tip }
}

#[test]
fn third_of_four_runs_failing_restores_and_rerun_succeeds() {
    let ws = workspace();
    let path = ws.fixture_dir().join("version3").join("flaky.db");
    let before = ws.head();
    let mut ctl = ws.controller();

    let write_runs = |fail_at: Option<usize>| {
        let path = path.clone();
        Generator::new("four_runs", move || {
            let mut store = fresh_store(&path, 3)?;
            let exp = store.new_experiment("experiment_1", "no_sample_1")?;
            let spec = DatasetSpec::on_grid(2, 1, &[5, 5], ValueKind::Numeric);
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            for run in 0..4 {
                if Some(run) == fail_at {
                    return Err(FixtureError::Assertion {
                        scenario: "four_runs",
                        message: format!("injected failure on run {}", run + 1),
                    }
                    .into());
                }
                generate_run(&mut store, exp, &spec, &mut rng)?;
            }
            Ok(())
        })
    };

    let err = ctl
        .run_at_version(&VersionId::Number(3), vec![write_runs(Some(2))])
        .unwrap_err();
    match &err {
        CheckoutError::Generator { source, .. } => {
            let fixture = source.downcast_ref::<FixtureError>().unwrap();
            assert!(matches!(fixture, FixtureError::Assertion { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ws.head(), before);

    let partial = SqliteStore::connect(&path, 3).unwrap();
    assert_eq!(partial.run_ids().unwrap().len(), 2);
    drop(partial);

    ctl.run_at_version(&VersionId::Number(3), vec![write_runs(None)])
        .unwrap();
    assert_eq!(ws.head(), before);
    let complete = SqliteStore::connect(&path, 3).unwrap();
    assert_eq!(complete.run_ids().unwrap().len(), 4);
}

#[test]
fn full_catalog_for_versions_two_and_three() {
    let ws = workspace();
    let before = ws.head();
    let mut ctl = ws.controller();

    for version in [VersionId::Number(2), VersionId::Number(3)] {
        let set = FixtureSet::for_version(version.clone(), ws.fixture_dir()).unwrap();
        ctl.run_at_version(&version, set.generators()).unwrap();
        let snapshot = ctl.registry().resolve(&version).unwrap().to_string();
        set.write_manifest(Some(&snapshot)).unwrap();
        assert_eq!(ws.head(), before);
    }

    let v3 = ws.fixture_dir().join("version3");
    for file in [
        "empty.db",
        "some_runs_without_run_description.db",
        "some_runs.db",
        "some_runs_upgraded_2.db",
        "manifest.json",
    ] {
        assert!(v3.join(file).is_file(), "{file}");
    }
    let upgraded = SqliteStore::connect(&v3.join("some_runs_upgraded_2.db"), 3).unwrap();
    assert_eq!(upgraded.user_version().unwrap(), 3);
    assert_eq!(upgraded.run_ids().unwrap().len(), 10);

    let manifest = FixtureManifest::read(&v3.join("manifest.json")).unwrap();
    assert_eq!(manifest.version, VersionId::Number(3));
    assert_eq!(manifest.snapshot_ref, Some(ws.snapshot.to_string()));
    assert_eq!(manifest.artifacts.len(), 4);

    let repo = Repository::open(ws.root()).unwrap();
    assert_eq!(
        repo.find_reference("refs/heads/main").unwrap().target(),
        Some(ws.tip)
    );
}

#[test]
fn version_three_alone_reports_the_missing_upstream() {
    let ws = workspace();
    let before = ws.head();
    let mut ctl = ws.controller();
    let set = FixtureSet::for_version(VersionId::Number(3), ws.fixture_dir()).unwrap();

    let err = ctl
        .run_at_version(&VersionId::Number(3), set.generators())
        .unwrap_err();
    match &err {
        CheckoutError::Generator { index, source, .. } => {
            assert_eq!(*index, 3);
            assert!(matches!(
                source.downcast_ref::<FixtureError>(),
                Some(FixtureError::MissingUpstream { .. })
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ws.head(), before);
}

#[test]
fn version_four_snapshot_fixtures() {
    let ws = workspace();
    let mut ctl = ws.controller();
    let set = FixtureSet::for_version(VersionId::Number(4), ws.fixture_dir()).unwrap();
    ctl.run_at_version(&VersionId::Number(4), set.generators())
        .unwrap();

    let with =
        SqliteStore::connect(&set.version_dir().join("with_runs_and_snapshots.db"), 4).unwrap();
    assert!(with.is_column_in_table("runs", "snapshot").unwrap());
    let without =
        SqliteStore::connect(&set.version_dir().join("with_runs_but_no_snapshots.db"), 4).unwrap();
    assert!(!without.is_column_in_table("runs", "snapshot").unwrap());
}
