//! Content-hash manifests of generated artifacts.
//!
//! Each version directory gets a `manifest.json` recording the size and
//! BLAKE3 hash of every artifact, so a regenerated fixture set can be
//! compared with the committed one without opening the databases.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use fixgen_checkout::VersionId;
use serde::{Deserialize, Serialize};

use crate::error::FixtureError;

pub const MANIFEST_FILE: &str = "manifest.json";

/// One artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub scenario: String,
    /// File name relative to the version directory.
    pub path: String,
    pub bytes: u64,
    /// Hex-encoded BLAKE3 of the file contents.
    pub blake3: String,
}

impl ArtifactRecord {
    /// Hashes the file at `path`.
    pub fn hash(scenario: &str, path: &Path) -> Result<Self, FixtureError> {
        let mut file = fs::File::open(path).map_err(|e| FixtureError::io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        let mut buf = [0u8; 64 * 1024];
        let mut bytes = 0u64;
        loop {
            let n = file.read(&mut buf).map_err(|e| FixtureError::io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            bytes += n as u64;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ArtifactRecord {
            scenario: scenario.to_string(),
            path: name,
            bytes,
            blake3: hasher.finalize().to_hex().to_string(),
        })
    }
}

/// Every artifact one version produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureManifest {
    pub version: VersionId,
    pub schema_level: u32,
    /// Snapshot the artifacts were generated at, when generated under a
    /// checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_ref: Option<String>,
    pub artifacts: Vec<ArtifactRecord>,
}

impl FixtureManifest {
    /// Writes `manifest.json` into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, FixtureError> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| FixtureError::io(&path, e))?;
        tracing::info!(path = %path.display(), artifacts = self.artifacts.len(), "wrote manifest");
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self, FixtureError> {
        let json = fs::read_to_string(path).map_err(|e| FixtureError::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn get(&self, scenario: &str) -> Option<&ArtifactRecord> {
        self.artifacts.iter().find(|a| a.scenario == scenario)
    }
}
