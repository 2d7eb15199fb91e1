//! Error types for fixture generation.

use std::path::PathBuf;

use fixgen_checkout::VersionId;
use fixgen_core::CoreError;
use fixgen_storage::StorageError;
use thiserror::Error;

/// Errors produced while writing fixtures or benchmark databases.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The storage collaborator failed; passed through unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Graph building or coordinate synthesis failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Preparing, copying or hashing an artifact failed.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A check on the written data did not hold.
    #[error("{scenario}: {message}")]
    Assertion {
        scenario: &'static str,
        message: String,
    },

    /// An artifact another version produces had not been generated yet.
    #[error("missing {} from version {version}; generate that version first", path.display())]
    MissingUpstream { version: VersionId, path: PathBuf },

    /// There is no scenario list for this version.
    #[error("no fixtures are defined for version {0}")]
    NoCatalog(VersionId),

    /// A benchmark was asked for zero runs, leaving nothing to time.
    #[error("benchmarks need at least one run")]
    NoBenchmarkRuns,

    /// The manifest could not be serialized.
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl FixtureError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FixtureError::Io {
            path: path.into(),
            source,
        }
    }
}
