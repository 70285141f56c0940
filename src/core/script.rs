//! Team scripts: ordered (action, argument) lists

use crate::core::{DocEntity, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptAction {
    /// Script action code; its argument meaning comes from the param catalog
    pub action: u32,
    pub argument: i64,
}

impl ScriptAction {
    pub fn new(action: u32, argument: i64) -> Self {
        ScriptAction { action, argument }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: EntityId,
    pub name: String,
    pub actions: Vec<ScriptAction>,
}

impl Script {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Script {
            id,
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: u32, argument: i64) -> Self {
        self.actions.push(ScriptAction::new(action, argument));
        self
    }
}

impl DocEntity for Script {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
