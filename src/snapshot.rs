//! Document snapshots on disk
//!
//! A snapshot is the entity graph as JSON. Session state (allocator
//! position, config, captured logs) is not stored; loading reseeds the
//! allocator from the highest id present so new ids never collide.

use crate::config::EditorConfig;
use crate::document::MapDocument;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current on-disk layout
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub version: u32,

    /// Free-form label, e.g. the map title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub document: MapDocument,
}

impl DocumentSnapshot {
    pub fn new(document: MapDocument) -> Self {
        DocumentSnapshot {
            version: SNAPSHOT_VERSION,
            label: None,
            document,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Save this snapshot to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        std::fs::write(path.as_ref(), json).map_err(|e| SnapshotError::Io(e.to_string()))?;

        Ok(())
    }

    /// Load a snapshot from a JSON file
    ///
    /// The document's references are checked and its allocator seeded
    /// before it is handed back.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let json =
            std::fs::read_to_string(path.as_ref()).map_err(|e| SnapshotError::Io(e.to_string()))?;

        let snapshot: DocumentSnapshot = serde_json::from_str(&json)
            .map_err(|e| SnapshotError::Deserialization(e.to_string()))?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::InvalidState(format!(
                "snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }
        snapshot
            .document
            .check_integrity()
            .map_err(|e| SnapshotError::InvalidState(e.to_string()))?;
        snapshot.document.seed_allocator();

        Ok(snapshot)
    }

    /// Take the document out, attaching an editor config
    pub fn into_document(self, config: EditorConfig) -> MapDocument {
        let mut document = self.document;
        document.config = config;
        document
    }
}

/// Errors that can occur during snapshot operations
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to serialize snapshot: {0}")]
    Serialization(String),

    #[error("Failed to deserialize snapshot: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid snapshot state: {0}")]
    InvalidState(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Entity, EntityId, MapCell, TaskForce, TeamType, Waypoint};
    use similar_asserts::assert_eq;

    fn sample_document() -> MapDocument {
        let mut doc = MapDocument::new();
        let tf = doc.allocator.allocate();
        let team = doc.allocator.allocate();
        doc.insert_entity(Entity::TaskForce(TaskForce::new(tf, "TF1").with_entry("E1", 4)))
            .unwrap();
        doc.insert_entity(Entity::TeamType(TeamType::new(team, "TT1").with_task_force(tf)))
            .unwrap();
        doc.insert_entity(Entity::Waypoint(Waypoint::new(12, MapCell::new(40, 41))))
            .unwrap();
        doc
    }

    #[test]
    fn test_save_and_load_seeds_allocator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        let doc = sample_document();

        DocumentSnapshot::new(doc.clone())
            .with_label("Test map")
            .save_to_file(&path)
            .unwrap();
        let loaded = DocumentSnapshot::load_from_file(&path).unwrap();

        assert_eq!(loaded.label.as_deref(), Some("Test map"));
        assert_eq!(loaded.document, doc);
        let next = loaded.document.allocator.allocate();
        assert!(next > doc.max_entity_id().unwrap());
    }

    #[test]
    fn test_load_rejects_dangling_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let mut doc = sample_document();
        let missing = EntityId::new(9_999_999);
        for team in doc.team_types.values_mut() {
            team.task_force = Some(missing);
        }
        DocumentSnapshot::new(doc).save_to_file(&path).unwrap();

        assert!(matches!(
            DocumentSnapshot::load_from_file(&path),
            Err(SnapshotError::InvalidState(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DocumentSnapshot::load_from_file(dir.path().join("nope.json")),
            Err(SnapshotError::Io(_))
        ));
    }
}
