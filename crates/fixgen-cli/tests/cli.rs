//! `fixgen` exit codes against scratch repositories and directories.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use git2::{Oid, Repository, RepositoryInitOptions, Signature};

fn fixgen_binary_path() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_fixgen"))
}

fn init_host(dir: &Path) -> Oid {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir, &opts).unwrap();
    fs::create_dir_all(dir.join("host")).unwrap();
    fs::write(dir.join("host").join("lib.txt"), "host library\n").unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("host/lib.txt")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("fixgen", "fixgen@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "host", &tree, &[])
        .unwrap()
}

fn generate(args: &[&str]) -> Output {
    Command::new(fixgen_binary_path())
        .arg("generate")
        .args(args)
        .env_remove("FIXGEN_REPO")
        .env_remove("FIXGEN_FIXTURE_DIR")
        .env_remove("FIXGEN_LIBRARY_ORIGIN")
        .env_remove("FIXGEN_REGISTRY")
        .output()
        .expect("run fixgen binary")
}

fn head(root: &Path) -> (bool, Oid) {
    let repo = Repository::open(root).unwrap();
    let detached = repo.head_detached().unwrap();
    let commit = repo.head().unwrap().peel_to_commit().unwrap().id();
    (detached, commit)
}

#[test]
fn library_outside_the_repo_exits_with_precondition_failure() {
    let host = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    init_host(host.path());
    let before = head(host.path());

    let output = generate(&[
        "0",
        "--repo",
        host.path().to_str().unwrap(),
        "--library-origin",
        elsewhere.path().to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("outside the working tree"), "stderr={stderr}");
    assert_eq!(head(host.path()), before);
    assert!(!host.path().join("tests").exists());
}

#[test]
fn missing_library_origin_exits_with_precondition_failure() {
    let host = tempfile::tempdir().unwrap();
    init_host(host.path());

    let output = generate(&["0", "--repo", host.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--library-origin"), "stderr={stderr}");
}

#[test]
fn library_inside_the_repo_generates_and_prints_the_manifest() {
    let host = tempfile::tempdir().unwrap();
    let commit = init_host(host.path());
    let config = tempfile::tempdir().unwrap();
    let registry = config.path().join("registry.json");
    fs::write(
        &registry,
        format!(r#"[{{"id": 5, "snapshot_ref": "{commit}", "notes": "scratch host"}}]"#),
    )
    .unwrap();

    let output = generate(&[
        "5",
        "--repo",
        host.path().to_str().unwrap(),
        "--library-origin",
        host.path().join("host").to_str().unwrap(),
        "--registry",
        registry.to_str().unwrap(),
    ]);

    assert!(
        output.status.success(),
        "expected success, stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let manifest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(manifest["version"], 5);
    assert_eq!(manifest["snapshot_ref"], commit.to_string());
    assert_eq!(manifest["artifacts"].as_array().unwrap().len(), 2);
    let version_dir = host.path().join("tests/fixtures/db_files/version5");
    assert!(version_dir.join("some_runs.db").is_file());
    assert!(version_dir.join("manifest.json").is_file());
}

#[test]
fn benchmark_refuses_zero_runs() {
    let out = tempfile::tempdir().unwrap();
    let output = Command::new(fixgen_binary_path())
        .args(["benchmark", "--runs", "0", "--out-dir"])
        .arg(out.path())
        .output()
        .expect("run fixgen binary");
    assert!(!output.status.success());
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}
