//! Fixture generation CLI.
//!
//! Provides the `fixgen` binary:
//! - `versions` lists the published schema versions
//! - `generate <VERSION>` checks the host repository out at that version,
//!   writes its fixtures and restores the repository
//! - `benchmark` writes timed benchmark databases
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::process;

use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use fixgen_checkout::{CheckoutController, CheckoutError, GitTree, VersionId};
use fixgen_cli::config::{load_registry, Config, ConfigError};
use fixgen_fixtures::{run_benchmarks, FixtureError, FixtureSet, DEFAULT_RUNS};

/// Versioned storage fixture generation.
#[derive(Parser)]
#[command(name = "fixgen", about = "Versioned storage fixture generation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List published versions and what each introduced.
    Versions {
        /// JSON file with extra registry entries.
        #[arg(long, env = "FIXGEN_REGISTRY")]
        registry: Option<PathBuf>,
    },

    /// Generate the fixtures of one version.
    Generate {
        /// Version id, e.g. `3` or `4a`.
        version: String,

        /// Working tree of the host library (default: current directory).
        #[arg(long, env = "FIXGEN_REPO")]
        repo: Option<PathBuf>,

        /// Fixture root (default: <repo>/tests/fixtures/db_files).
        #[arg(long, env = "FIXGEN_FIXTURE_DIR")]
        fixture_dir: Option<PathBuf>,

        /// Path the host library is loaded from; must lie inside the repo.
        #[arg(long, env = "FIXGEN_LIBRARY_ORIGIN")]
        library_origin: Option<PathBuf>,

        /// JSON file with extra registry entries.
        #[arg(long, env = "FIXGEN_REGISTRY")]
        registry: Option<PathBuf>,
    },

    /// Write benchmark databases and print their timings.
    Benchmark {
        /// Output directory.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Runs per database (at least one).
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_RUNS,
            value_parser = RangedU64ValueParser::<usize>::new().range(1..)
        )]
        runs: usize,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Versions { registry } => run_versions(registry),
        Commands::Generate {
            version,
            repo,
            fixture_dir,
            library_origin,
            registry,
        } => run_generate(&version, repo, fixture_dir, library_origin, registry),
        Commands::Benchmark { out_dir, runs } => run_benchmark(out_dir, runs),
    };
    process::exit(exit_code);
}

/// Execute the versions subcommand.
///
/// Returns exit code: 0 = success, 3 = unreadable registry.
fn run_versions(registry: Option<PathBuf>) -> i32 {
    let registry = match load_registry(registry.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };
    for entry in registry.entries() {
        println!("{}\t{}\t{}", entry.id, entry.snapshot_ref, entry.notes);
    }
    0
}

/// Execute the generate subcommand.
///
/// Returns exit code: 0 = success, 1 = a fixture failed,
/// 2 = precondition failure or missing library origin, 3 = I/O or other error.
fn run_generate(
    version: &str,
    repo: Option<PathBuf>,
    fixture_dir: Option<PathBuf>,
    library_origin: Option<PathBuf>,
    registry: Option<PathBuf>,
) -> i32 {
    let config = match Config::resolve(repo, fixture_dir, library_origin, registry) {
        Ok(c) => c,
        Err(e @ ConfigError::MissingLibraryOrigin) => {
            eprintln!("Error: {}", e);
            return 2;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };
    let registry = match config.registry() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };

    let version = VersionId::from(version);
    let set = match FixtureSet::for_version(version.clone(), &config.fixture_dir) {
        Ok(s) => s,
        Err(e @ FixtureError::NoCatalog(_)) => {
            eprintln!("Error: {}", e);
            return 2;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };

    let tree = match GitTree::discover(&config.repo) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: failed to open repository '{}': {}", config.repo.display(), e);
            return 3;
        }
    };
    let mut controller = CheckoutController::new(tree, registry, &config.library_origin);

    match controller.run_at_version(&version, set.generators()) {
        Ok(()) => {}
        Err(e) if e.is_precondition() => {
            eprintln!("Error: {}", e);
            return 2;
        }
        Err(e @ CheckoutError::Generator { .. }) => {
            eprintln!("Fixture generation failed: {}", e);
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    }

    let snapshot = controller.registry().resolve(&version).ok().map(str::to_string);
    let manifest = match set.manifest(snapshot.as_deref()) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: failed to hash artifacts: {}", e);
            return 3;
        }
    };
    if let Err(e) = manifest.write_to(&set.version_dir()) {
        eprintln!("Error: failed to write manifest: {}", e);
        return 3;
    }

    let json = serde_json::to_string_pretty(&manifest).unwrap_or_else(|e| {
        format!("{{\"error\": \"failed to serialize manifest: {}\"}}", e)
    });
    println!("{}", json);
    0
}

/// Execute the benchmark subcommand.
///
/// Returns exit code: 0 = success, 1 = generation failed, 3 = I/O error.
fn run_benchmark(out_dir: PathBuf, runs: usize) -> i32 {
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        eprintln!("Error: cannot create '{}': {}", out_dir.display(), e);
        return 3;
    }
    match run_benchmarks(&out_dir, runs) {
        Ok(report) => {
            let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
                format!("{{\"error\": \"failed to serialize report: {}\"}}", e)
            });
            println!("{}", json);
            0
        }
        Err(e @ FixtureError::Io { .. }) => {
            eprintln!("I/O error: {}", e);
            3
        }
        Err(e) => {
            eprintln!("Benchmark failed: {}", e);
            1
        }
    }
}
