//! Schema versions and the snapshots that produced them.
//!
//! Each [`VersionEntry`] maps a schema version to the commit of the host
//! library just before the next version was introduced, together with a note
//! on what changed at that boundary. The registry is append-only: once
//! published, a version keeps its snapshot forever, since fixtures generated
//! from it would silently change otherwise.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RegistryError;

/// A schema version: a plain number, or a label for off-sequence snapshots
/// such as bug-fix re-runs (`4a`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionId {
    Number(u32),
    Label(String),
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionId::Number(n) => write!(f, "{n}"),
            VersionId::Label(label) => f.write_str(label),
        }
    }
}

impl FromStr for VersionId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        Ok(match s.parse::<u32>() {
            Ok(n) if digits => VersionId::Number(n),
            _ => VersionId::Label(s.to_string()),
        })
    }
}

impl From<u32> for VersionId {
    fn from(n: u32) -> Self {
        VersionId::Number(n)
    }
}

impl From<&str> for VersionId {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VersionId::Number(n) => serializer.serialize_u32(*n),
            VersionId::Label(label) => serializer.serialize_str(label),
        }
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => VersionId::Number(n),
            Raw::Text(text) => VersionId::from(text.as_str()),
        })
    }
}

/// One published schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub id: VersionId,
    /// Commit (or other revision) the tree is moved to for this version.
    pub snapshot_ref: String,
    /// What the schema gained at this boundary. Documentation only.
    pub notes: String,
}

impl VersionEntry {
    pub fn new(id: impl Into<VersionId>, snapshot_ref: &str, notes: &str) -> Self {
        VersionEntry {
            id: id.into(),
            snapshot_ref: snapshot_ref.to_string(),
            notes: notes.to_string(),
        }
    }
}

/// Append-only mapping from version to snapshot.
#[derive(Debug, Clone, Default)]
pub struct VersionRegistry {
    entries: IndexMap<VersionId, VersionEntry>,
}

impl VersionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        VersionRegistry::default()
    }

    /// Builds a registry from entries in publication order.
    pub fn from_entries<I>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = VersionEntry>,
    {
        let mut registry = VersionRegistry::new();
        registry.extend(entries)?;
        Ok(registry)
    }

    /// The published history of the storage schema.
    ///
    /// Each hash is the commit just before the following version was
    /// introduced.
    pub fn builtin() -> Self {
        let entries = [
            VersionEntry::new(
                VersionId::Number(0),
                "78d42620fc245a975b5a615ed5e33061baac7846",
                "original schema: runs, experiments, layouts, dependencies and result tables",
            ),
            VersionEntry::new(
                VersionId::Number(1),
                "056d59627e22fa3ca7aad4c265e9897c343f79cf",
                "adds a guid column to the runs table",
            ),
            VersionEntry::new(
                VersionId::Number(2),
                "5202255924542dad6841dfe3d941a7f80c43956c",
                "adds indices on runs for guid and exp_id",
            ),
            VersionEntry::new(
                VersionId::Number(3),
                "17436006caceaeb42ea66e5cbaca40bb4c54306a",
                "adds a run_description column to the runs table",
            ),
            VersionEntry::new(
                "4a",
                "6b8f4d1940215a8cefc5f4c399c6aaaeee082d54",
                "schema 3 again, from a merge that broke how run_description was written; \
                 kept to exercise the bug-fix upgrader rather than promoted to a version",
            ),
            VersionEntry::new(
                VersionId::Number(4),
                "57ad8711d158f68ecf101006bb8f2072aee157ab",
                "snapshot column is made always present in the runs table",
            ),
        ];
        let mut registry = VersionRegistry::new();
        for entry in entries {
            registry.entries.insert(entry.id.clone(), entry);
        }
        registry
    }

    /// Parses a JSON array of entries.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let entries: Vec<VersionEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Reads entries from a JSON file.
    pub fn load(path: &Path) -> Result<Vec<VersionEntry>, RegistryError> {
        let json = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Publishes one entry.
    ///
    /// Republishing an identical entry is a no-op; pointing a published id
    /// at a different snapshot fails. Notes may not change either, so they
    /// always describe the snapshot they were published with.
    pub fn publish(&mut self, entry: VersionEntry) -> Result<(), RegistryError> {
        if let Some(existing) = self.entries.get(&entry.id) {
            if existing.snapshot_ref != entry.snapshot_ref {
                return Err(RegistryError::VersionRemapped {
                    id: entry.id,
                    published: existing.snapshot_ref.clone(),
                    requested: entry.snapshot_ref,
                });
            }
            if existing.notes != entry.notes {
                return Err(RegistryError::NotesChanged {
                    id: entry.id,
                    published: existing.notes.clone(),
                    requested: entry.notes,
                });
            }
            return Ok(());
        }
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Publishes several entries in order, stopping at the first conflict.
    pub fn extend<I>(&mut self, entries: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = VersionEntry>,
    {
        for entry in entries {
            self.publish(entry)?;
        }
        Ok(())
    }

    /// Snapshot reference for `id`.
    pub fn resolve(&self, id: &VersionId) -> Result<&str, RegistryError> {
        self.get(id).map(|entry| entry.snapshot_ref.as_str())
    }

    /// Full entry for `id`.
    pub fn get(&self, id: &VersionId) -> Result<&VersionEntry, RegistryError> {
        self.entries
            .get(id)
            .ok_or_else(|| RegistryError::UnknownVersion(id.clone()))
    }

    pub fn contains(&self, id: &VersionId) -> bool {
        self.entries.contains_key(id)
    }

    /// Entries in publication order.
    pub fn entries(&self) -> impl Iterator<Item = &VersionEntry> + '_ {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn version_ids_parse_numbers_and_labels() {
        assert_eq!(VersionId::from("3"), VersionId::Number(3));
        assert_eq!(VersionId::from("4a"), VersionId::Label("4a".into()));
        assert_eq!(VersionId::from("4a").to_string(), "4a");
        assert_eq!(VersionId::from("+3"), VersionId::Label("+3".into()));
    }

    #[test]
    fn version_ids_use_json_numbers_and_strings() {
        let ids: Vec<VersionId> = serde_json::from_str(r#"[7, "4a", "5"]"#).unwrap();
        assert_eq!(
            ids,
            vec![
                VersionId::Number(7),
                VersionId::Label("4a".into()),
                VersionId::Number(5)
            ]
        );
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"[7,"4a",5]"#);
    }

    #[test]
    fn builtin_resolves_published_versions() {
        let registry = VersionRegistry::builtin();
        assert_eq!(
            registry.resolve(&VersionId::Number(3)).unwrap(),
            "17436006caceaeb42ea66e5cbaca40bb4c54306a"
        );
        assert_eq!(
            registry.resolve(&"4a".into()).unwrap(),
            "6b8f4d1940215a8cefc5f4c399c6aaaeee082d54"
        );
        let order: Vec<String> = registry.entries().map(|e| e.id.to_string()).collect();
        assert_eq!(order, ["0", "1", "2", "3", "4a", "4"]);
        assert!(registry.entries().all(|e| !e.notes.is_empty()));
    }

    #[test]
    fn unknown_version_fails() {
        let registry = VersionRegistry::builtin();
        let err = registry.resolve(&VersionId::Number(99)).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownVersion(VersionId::Number(99))));
    }

    #[test]
    fn published_versions_cannot_be_remapped() {
        let mut registry = VersionRegistry::builtin();
        let err = registry
            .publish(VersionEntry::new(VersionId::Number(0), "deadbeef", "rewritten history"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::VersionRemapped { .. }));
        assert_eq!(
            registry.resolve(&VersionId::Number(0)).unwrap(),
            "78d42620fc245a975b5a615ed5e33061baac7846"
        );
    }

    #[test]
    fn notes_are_fixed_once_published() {
        let mut registry = VersionRegistry::builtin();
        let mut entry = registry.get(&VersionId::Number(2)).unwrap().clone();
        entry.notes = "indices, reworded".to_string();
        match registry.publish(entry).unwrap_err() {
            RegistryError::NotesChanged { id, published, requested } => {
                assert_eq!(id, VersionId::Number(2));
                assert_eq!(published, "adds indices on runs for guid and exp_id");
                assert_eq!(requested, "indices, reworded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn republishing_the_same_entry_is_a_no_op() {
        let mut registry = VersionRegistry::builtin();
        let entry = registry.get(&VersionId::Number(1)).unwrap().clone();
        registry.publish(entry).unwrap();
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn json_registries_append() {
        let json = r#"[
            {"id": 0, "snapshot_ref": "aaa", "notes": "base"},
            {"id": "1", "snapshot_ref": "bbb", "notes": "guid"}
        ]"#;
        let registry = VersionRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.resolve(&VersionId::Number(1)).unwrap(), "bbb");
        assert!(!registry.contains(&VersionId::Number(2)));
    }

    proptest! {
        #[test]
        fn published_snapshots_never_move(
            attempts in proptest::collection::vec((0u32..8, "[0-9a-f]{6}"), 0..16)
        ) {
            let builtin = VersionRegistry::builtin();
            let mut registry = builtin.clone();
            for (id, snapshot_ref) in attempts {
                let entry = VersionEntry::new(VersionId::Number(id), &snapshot_ref, "attempt");
                let _ = registry.publish(entry);
            }
            for entry in builtin.entries() {
                prop_assert_eq!(
                    registry.resolve(&entry.id).unwrap(),
                    entry.snapshot_ref.as_str()
                );
            }
        }
    }
}
