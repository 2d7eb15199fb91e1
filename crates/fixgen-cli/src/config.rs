//! Resolved command-line configuration.
//!
//! Path flags may come from their `FIXGEN_*` environment variables instead
//! of the command line. Defaults are filled in here, except for the library
//! origin: it describes the environment the fixtures are generated in, so
//! it has to be stated.

use std::io;
use std::path::{Path, PathBuf};

use fixgen_checkout::{RegistryError, VersionRegistry};
use thiserror::Error;

/// Fixture directory relative to the repository root.
pub const DEFAULT_FIXTURE_SUBDIR: &str = "tests/fixtures/db_files";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine repository: {0}")]
    CurrentDir(#[source] io::Error),

    #[error(
        "the path the host library is loaded from is required; \
         pass --library-origin or set FIXGEN_LIBRARY_ORIGIN"
    )]
    MissingLibraryOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Working tree of the host library.
    pub repo: PathBuf,
    /// Root under which `version<id>` directories are written.
    pub fixture_dir: PathBuf,
    /// Where the host library is loaded from.
    pub library_origin: PathBuf,
    /// Extra registry entries published on top of the builtin ones.
    pub registry_file: Option<PathBuf>,
}

impl Config {
    /// Fills in defaults: the repository is the current directory and
    /// fixtures go under it. The library origin has no default.
    pub fn resolve(
        repo: Option<PathBuf>,
        fixture_dir: Option<PathBuf>,
        library_origin: Option<PathBuf>,
        registry_file: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let library_origin = library_origin.ok_or(ConfigError::MissingLibraryOrigin)?;
        let repo = match repo {
            Some(repo) => repo,
            None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
        };
        Ok(Self::with_repo(repo, fixture_dir, library_origin, registry_file))
    }

    fn with_repo(
        repo: PathBuf,
        fixture_dir: Option<PathBuf>,
        library_origin: PathBuf,
        registry_file: Option<PathBuf>,
    ) -> Self {
        let fixture_dir = fixture_dir.unwrap_or_else(|| default_fixture_dir(&repo));
        Config {
            repo,
            fixture_dir,
            library_origin,
            registry_file,
        }
    }

    /// The builtin registry, extended by the registry file if one is set.
    pub fn registry(&self) -> Result<VersionRegistry, RegistryError> {
        load_registry(self.registry_file.as_deref())
    }
}

pub fn default_fixture_dir(repo: &Path) -> PathBuf {
    repo.join(DEFAULT_FIXTURE_SUBDIR)
}

/// The builtin registry, extended by `file` if given.
pub fn load_registry(file: Option<&Path>) -> Result<VersionRegistry, RegistryError> {
    let mut registry = VersionRegistry::builtin();
    if let Some(file) = file {
        registry.extend(VersionRegistry::load(file)?)?;
        tracing::debug!(path = %file.display(), versions = registry.len(), "loaded registry file");
    }
    Ok(registry)
}
