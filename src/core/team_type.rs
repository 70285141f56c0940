//! Team types: a task force plus script, tag, owner and AI behaviour flags

use crate::core::{DocEntity, EntityId, WaypointId};
use serde::{Deserialize, Serialize};

/// Boolean behaviour switches of a team type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamFlags {
    pub aggressive: bool,
    pub annoyance: bool,
    pub autocreate: bool,
    pub droppod: bool,
    pub full: bool,
    pub guard_slower: bool,
    pub loadable: bool,
    pub prebuild: bool,
    pub recruiter: bool,
    pub reinforce: bool,
    pub suicide: bool,
    pub whiplash: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamType {
    pub id: EntityId,
    pub name: String,

    pub task_force: Option<EntityId>,
    pub script: Option<EntityId>,
    pub tag: Option<EntityId>,

    /// Owning country
    pub house_type: Option<EntityId>,

    pub waypoint: Option<WaypointId>,
    pub transport_waypoint: Option<WaypointId>,

    pub flags: TeamFlags,
    pub priority: u32,
    pub max: u32,
    pub tech_level: u8,
    pub veteran_level: u8,
    pub group: i32,
}

impl TeamType {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        TeamType {
            id,
            name: name.into(),
            task_force: None,
            script: None,
            tag: None,
            house_type: None,
            waypoint: None,
            transport_waypoint: None,
            flags: TeamFlags::default(),
            priority: 5,
            max: 5,
            tech_level: 0,
            veteran_level: 1,
            group: -1,
        }
    }

    pub fn with_task_force(mut self, task_force: EntityId) -> Self {
        self.task_force = Some(task_force);
        self
    }

    pub fn with_script(mut self, script: EntityId) -> Self {
        self.script = Some(script);
        self
    }

    pub fn with_waypoint(mut self, waypoint: WaypointId) -> Self {
        self.waypoint = Some(waypoint);
        self
    }
}

impl DocEntity for TeamType {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
