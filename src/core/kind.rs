//! Tagged dispatch over entity kinds
//!
//! `EntityRef` names an entity (kind + durable key) without borrowing it;
//! `Entity` owns one. Every kind-specific rule in the edit layer matches on
//! these once instead of switching on section-name strings.

use crate::core::{
    AiTriggerType, DocEntity, EntityId, House, HouseType, LocalVariable, Script, Tag, TaskForce,
    TeamType, Trigger, Waypoint, WaypointId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    House,
    HouseType,
    TaskForce,
    TeamType,
    Script,
    Trigger,
    Tag,
    AiTrigger,
    Waypoint,
    LocalVariable,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::House => "House",
            EntityKind::HouseType => "House type",
            EntityKind::TaskForce => "Task force",
            EntityKind::TeamType => "Team type",
            EntityKind::Script => "Script",
            EntityKind::Trigger => "Trigger",
            EntityKind::Tag => "Tag",
            EntityKind::AiTrigger => "AI trigger",
            EntityKind::Waypoint => "Waypoint",
            EntityKind::LocalVariable => "Local variable",
        };
        f.write_str(label)
    }
}

/// Non-owning handle to a document entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    House(EntityId),
    HouseType(EntityId),
    TaskForce(EntityId),
    TeamType(EntityId),
    Script(EntityId),
    Trigger(EntityId),
    Tag(EntityId),
    AiTrigger(EntityId),
    Waypoint(WaypointId),
    LocalVariable(u32),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::House(_) => EntityKind::House,
            EntityRef::HouseType(_) => EntityKind::HouseType,
            EntityRef::TaskForce(_) => EntityKind::TaskForce,
            EntityRef::TeamType(_) => EntityKind::TeamType,
            EntityRef::Script(_) => EntityKind::Script,
            EntityRef::Trigger(_) => EntityKind::Trigger,
            EntityRef::Tag(_) => EntityKind::Tag,
            EntityRef::AiTrigger(_) => EntityKind::AiTrigger,
            EntityRef::Waypoint(_) => EntityKind::Waypoint,
            EntityRef::LocalVariable(_) => EntityKind::LocalVariable,
        }
    }

    /// The allocator-issued id, for id-keyed kinds
    pub fn entity_id(&self) -> Option<EntityId> {
        match *self {
            EntityRef::House(id)
            | EntityRef::HouseType(id)
            | EntityRef::TaskForce(id)
            | EntityRef::TeamType(id)
            | EntityRef::Script(id)
            | EntityRef::Trigger(id)
            | EntityRef::Tag(id)
            | EntityRef::AiTrigger(id) => Some(id),
            EntityRef::Waypoint(_) | EntityRef::LocalVariable(_) => None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Waypoint(wp) => write!(f, "{} {}", self.kind(), wp),
            EntityRef::LocalVariable(index) => write!(f, "{} {}", self.kind(), index),
            _ => match self.entity_id() {
                Some(id) => write!(f, "{} {}", self.kind(), id),
                None => write!(f, "{}", self.kind()),
            },
        }
    }
}

/// An owned entity value of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    House(House),
    HouseType(HouseType),
    TaskForce(TaskForce),
    TeamType(TeamType),
    Script(Script),
    Trigger(Trigger),
    Tag(Tag),
    AiTrigger(AiTriggerType),
    Waypoint(Waypoint),
    LocalVariable(LocalVariable),
}

impl Entity {
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Entity::House(e) => EntityRef::House(e.id),
            Entity::HouseType(e) => EntityRef::HouseType(e.id),
            Entity::TaskForce(e) => EntityRef::TaskForce(e.id),
            Entity::TeamType(e) => EntityRef::TeamType(e.id),
            Entity::Script(e) => EntityRef::Script(e.id),
            Entity::Trigger(e) => EntityRef::Trigger(e.id),
            Entity::Tag(e) => EntityRef::Tag(e.id),
            Entity::AiTrigger(e) => EntityRef::AiTrigger(e.id),
            Entity::Waypoint(e) => EntityRef::Waypoint(e.id),
            Entity::LocalVariable(e) => EntityRef::LocalVariable(e.index),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.entity_ref().kind()
    }

    /// Display name (waypoints use their number)
    pub fn display_name(&self) -> String {
        match self {
            Entity::House(e) => e.name().to_string(),
            Entity::HouseType(e) => e.name().to_string(),
            Entity::TaskForce(e) => e.name().to_string(),
            Entity::TeamType(e) => e.name().to_string(),
            Entity::Script(e) => e.name().to_string(),
            Entity::Trigger(e) => e.name().to_string(),
            Entity::Tag(e) => e.name().to_string(),
            Entity::AiTrigger(e) => e.name().to_string(),
            Entity::Waypoint(e) => e.id.to_string(),
            Entity::LocalVariable(e) => e.name.clone(),
        }
    }

    /// Rename in place; waypoints have no name and are left untouched
    pub fn set_name(&mut self, name: String) {
        match self {
            Entity::House(e) => e.name = name,
            Entity::HouseType(e) => e.name = name,
            Entity::TaskForce(e) => e.name = name,
            Entity::TeamType(e) => e.name = name,
            Entity::Script(e) => e.name = name,
            Entity::Trigger(e) => e.name = name,
            Entity::Tag(e) => e.name = name,
            Entity::AiTrigger(e) => e.name = name,
            Entity::LocalVariable(e) => e.name = name,
            Entity::Waypoint(_) => {}
        }
    }

    /// Replace the allocator-issued id; no-op for waypoints and variables
    pub fn set_id(&mut self, id: EntityId) {
        match self {
            Entity::House(e) => e.id = id,
            Entity::HouseType(e) => e.id = id,
            Entity::TaskForce(e) => e.id = id,
            Entity::TeamType(e) => e.id = id,
            Entity::Script(e) => e.id = id,
            Entity::Trigger(e) => e.id = id,
            Entity::Tag(e) => e.id = id,
            Entity::AiTrigger(e) => e.id = id,
            Entity::Waypoint(_) | Entity::LocalVariable(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_display() {
        let r = EntityRef::TaskForce(EntityId::new(1_000_003));
        assert_eq!(r.to_string(), "Task force 01000003");
        assert_eq!(
            EntityRef::Waypoint(WaypointId::new(7)).to_string(),
            "Waypoint 7"
        );
    }

    #[test]
    fn test_set_id_keeps_kind() {
        let mut e = Entity::TaskForce(TaskForce::new(EntityId::new(1), "TF"));
        e.set_id(EntityId::new(2));
        assert_eq!(e.entity_ref(), EntityRef::TaskForce(EntityId::new(2)));
    }
}
