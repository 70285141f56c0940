//! Task forces: ordered rosters of unit types and counts

use crate::core::{DocEntity, EntityId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One roster slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskForceEntry {
    /// Unit type name (e.g. "E1", "MTNK")
    pub unit_type: String,
    pub count: u32,
}

impl TaskForceEntry {
    pub fn new(unit_type: impl Into<String>, count: u32) -> Self {
        TaskForceEntry {
            unit_type: unit_type.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskForce {
    pub id: EntityId,
    pub name: String,
    pub group: i32,
    pub entries: SmallVec<[TaskForceEntry; 6]>,
}

impl TaskForce {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        TaskForce {
            id,
            name: name.into(),
            group: -1,
            entries: SmallVec::new(),
        }
    }

    pub fn with_entry(mut self, unit_type: impl Into<String>, count: u32) -> Self {
        self.entries.push(TaskForceEntry::new(unit_type, count));
        self
    }

    /// Total number of units across all slots
    pub fn unit_count(&self) -> u32 {
        self.entries.iter().map(|e| e.count).sum()
    }
}

impl DocEntity for TaskForce {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
