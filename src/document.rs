//! The map document: the in-memory entity graph
//!
//! The document owns every entity. Everything else (mutations, scans, the
//! clone engine, UI layers) holds `EntityRef`s and resolves them here.

use crate::config::EditorConfig;
use crate::core::{
    AiTriggerType, DocEntity, Entity, EntityId, EntityRef, EntityStore, House, HouseType,
    IdAllocator, LocalVariable, Script, Tag, TaskForce, TeamType, Trigger, Waypoint, WaypointId,
};
use crate::edit::logger::EditLogger;
use crate::{EditError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapDocument {
    pub houses: EntityStore<House>,
    pub house_types: EntityStore<HouseType>,
    pub task_forces: EntityStore<TaskForce>,
    pub team_types: EntityStore<TeamType>,
    pub scripts: EntityStore<Script>,
    pub triggers: EntityStore<Trigger>,
    pub tags: EntityStore<Tag>,
    pub ai_triggers: EntityStore<AiTriggerType>,

    /// Keyed by waypoint number
    pub waypoints: BTreeMap<u32, Waypoint>,

    /// Keyed by variable index
    pub local_variables: BTreeMap<u32, LocalVariable>,

    /// Id source; reseeded from the loaded ids after deserialization
    #[serde(skip)]
    pub allocator: IdAllocator,

    #[serde(skip)]
    pub config: EditorConfig,

    #[serde(skip)]
    pub logger: EditLogger,
}

impl MapDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EditorConfig) -> Self {
        MapDocument {
            config,
            ..Self::default()
        }
    }

    /// Highest allocator-issued id present in any collection
    pub fn max_entity_id(&self) -> Option<EntityId> {
        [
            self.houses.max_id(),
            self.house_types.max_id(),
            self.task_forces.max_id(),
            self.team_types.max_id(),
            self.scripts.max_id(),
            self.triggers.max_id(),
            self.tags.max_id(),
            self.ai_triggers.max_id(),
        ]
        .into_iter()
        .flatten()
        .max()
    }

    /// Make sure fresh ids cannot collide with loaded ones
    pub fn seed_allocator(&self) {
        if let Some(max) = self.max_entity_id() {
            self.allocator.seed(max);
        }
    }

    pub fn contains(&self, target: EntityRef) -> bool {
        match target {
            EntityRef::House(id) => self.houses.contains(id),
            EntityRef::HouseType(id) => self.house_types.contains(id),
            EntityRef::TaskForce(id) => self.task_forces.contains(id),
            EntityRef::TeamType(id) => self.team_types.contains(id),
            EntityRef::Script(id) => self.scripts.contains(id),
            EntityRef::Trigger(id) => self.triggers.contains(id),
            EntityRef::Tag(id) => self.tags.contains(id),
            EntityRef::AiTrigger(id) => self.ai_triggers.contains(id),
            EntityRef::Waypoint(wp) => self.waypoints.contains_key(&wp.as_u32()),
            EntityRef::LocalVariable(index) => self.local_variables.contains_key(&index),
        }
    }

    /// Owned copy of an entity
    pub fn get_entity(&self, target: EntityRef) -> Option<Entity> {
        match target {
            EntityRef::House(id) => self.houses.get(id).cloned().map(Entity::House),
            EntityRef::HouseType(id) => self.house_types.get(id).cloned().map(Entity::HouseType),
            EntityRef::TaskForce(id) => self.task_forces.get(id).cloned().map(Entity::TaskForce),
            EntityRef::TeamType(id) => self.team_types.get(id).cloned().map(Entity::TeamType),
            EntityRef::Script(id) => self.scripts.get(id).cloned().map(Entity::Script),
            EntityRef::Trigger(id) => self.triggers.get(id).cloned().map(Entity::Trigger),
            EntityRef::Tag(id) => self.tags.get(id).cloned().map(Entity::Tag),
            EntityRef::AiTrigger(id) => self.ai_triggers.get(id).cloned().map(Entity::AiTrigger),
            EntityRef::Waypoint(wp) => self
                .waypoints
                .get(&wp.as_u32())
                .copied()
                .map(Entity::Waypoint),
            EntityRef::LocalVariable(index) => self
                .local_variables
                .get(&index)
                .cloned()
                .map(Entity::LocalVariable),
        }
    }

    /// Human-readable name of an entity, if present
    pub fn entity_name(&self, target: EntityRef) -> Option<String> {
        match target {
            EntityRef::House(id) => self.houses.get(id).map(|e| e.name.clone()),
            EntityRef::HouseType(id) => self.house_types.get(id).map(|e| e.name.clone()),
            EntityRef::TaskForce(id) => self.task_forces.get(id).map(|e| e.name.clone()),
            EntityRef::TeamType(id) => self.team_types.get(id).map(|e| e.name.clone()),
            EntityRef::Script(id) => self.scripts.get(id).map(|e| e.name.clone()),
            EntityRef::Trigger(id) => self.triggers.get(id).map(|e| e.name.clone()),
            EntityRef::Tag(id) => self.tags.get(id).map(|e| e.name.clone()),
            EntityRef::AiTrigger(id) => self.ai_triggers.get(id).map(|e| e.name.clone()),
            EntityRef::Waypoint(wp) => self.waypoints.get(&wp.as_u32()).map(|w| w.id.to_string()),
            EntityRef::LocalVariable(index) => {
                self.local_variables.get(&index).map(|v| v.name.clone())
            }
        }
    }

    /// Insert into the owning collection; the key must be free
    pub fn insert_entity(&mut self, entity: Entity) -> Result<()> {
        match entity {
            Entity::House(e) => self.houses.insert(e),
            Entity::HouseType(e) => self.house_types.insert(e),
            Entity::TaskForce(e) => self.task_forces.insert(e),
            Entity::TeamType(e) => self.team_types.insert(e),
            Entity::Script(e) => self.scripts.insert(e),
            Entity::Trigger(e) => self.triggers.insert(e),
            Entity::Tag(e) => self.tags.insert(e),
            Entity::AiTrigger(e) => self.ai_triggers.insert(e),
            Entity::Waypoint(w) => {
                let key = w.id.as_u32();
                if self.waypoints.contains_key(&key) {
                    return Err(EditError::IntegrityViolation(format!(
                        "waypoint {key} is already in use"
                    )));
                }
                self.waypoints.insert(key, w);
                Ok(())
            }
            Entity::LocalVariable(v) => {
                let key = v.index;
                if self.local_variables.contains_key(&key) {
                    return Err(EditError::IntegrityViolation(format!(
                        "local variable {key} is already in use"
                    )));
                }
                self.local_variables.insert(key, v);
                Ok(())
            }
        }
    }

    /// Physically remove from the owning collection
    ///
    /// Does not touch references; callers go through the integrity resolver.
    pub fn remove_entity(&mut self, target: EntityRef) -> Result<Entity> {
        let removed = match target {
            EntityRef::House(id) => self.houses.remove(id).map(Entity::House),
            EntityRef::HouseType(id) => self.house_types.remove(id).map(Entity::HouseType),
            EntityRef::TaskForce(id) => self.task_forces.remove(id).map(Entity::TaskForce),
            EntityRef::TeamType(id) => self.team_types.remove(id).map(Entity::TeamType),
            EntityRef::Script(id) => self.scripts.remove(id).map(Entity::Script),
            EntityRef::Trigger(id) => self.triggers.remove(id).map(Entity::Trigger),
            EntityRef::Tag(id) => self.tags.remove(id).map(Entity::Tag),
            EntityRef::AiTrigger(id) => self.ai_triggers.remove(id).map(Entity::AiTrigger),
            EntityRef::Waypoint(wp) => self.waypoints.remove(&wp.as_u32()).map(Entity::Waypoint),
            EntityRef::LocalVariable(index) => {
                self.local_variables.remove(&index).map(Entity::LocalVariable)
            }
        };
        removed.ok_or(EditError::EntityNotFound(target))
    }

    pub fn house_by_name(&self, name: &str) -> Option<&House> {
        self.houses.find_by_name(name)
    }

    pub fn waypoint(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.get(&id.as_u32())
    }

    /// Houses backed by the given house type
    pub fn house_type_owners(&self, house_type: EntityId) -> Vec<EntityId> {
        self.houses
            .iter_ordered()
            .filter(|h| h.house_type == Some(house_type))
            .map(|h| h.id)
            .collect()
    }

    /// Verify that every id reference points at a live entity
    ///
    /// A failure means the resolver was bypassed somewhere upstream.
    pub fn check_integrity(&self) -> Result<()> {
        let dangling = |holder: EntityRef, field: &str, target: EntityRef| {
            EditError::IntegrityViolation(format!("{holder} {field} points at missing {target}"))
        };

        for house in self.houses.iter_ordered() {
            if let Some(ht) = house.house_type {
                if !self.house_types.contains(ht) {
                    return Err(dangling(
                        EntityRef::House(house.id),
                        "house type",
                        EntityRef::HouseType(ht),
                    ));
                }
            }
        }

        for team in self.team_types.iter_ordered() {
            let holder = EntityRef::TeamType(team.id);
            let checks = [
                ("task force", team.task_force.map(EntityRef::TaskForce)),
                ("script", team.script.map(EntityRef::Script)),
                ("tag", team.tag.map(EntityRef::Tag)),
                ("house type", team.house_type.map(EntityRef::HouseType)),
                ("waypoint", team.waypoint.map(EntityRef::Waypoint)),
                (
                    "transport waypoint",
                    team.transport_waypoint.map(EntityRef::Waypoint),
                ),
            ];
            for (field, target) in checks {
                if let Some(target) = target {
                    if !self.contains(target) {
                        return Err(dangling(holder, field, target));
                    }
                }
            }
        }

        for ai in self.ai_triggers.iter_ordered() {
            for (field, team) in [("primary team", ai.primary_team), ("secondary team", ai.secondary_team)] {
                if let Some(team) = team {
                    if !self.team_types.contains(team) {
                        return Err(dangling(
                            EntityRef::AiTrigger(ai.id),
                            field,
                            EntityRef::TeamType(team),
                        ));
                    }
                }
            }
        }

        for tag in self.tags.iter_ordered() {
            if !self.triggers.contains(tag.trigger) {
                return Err(dangling(
                    EntityRef::Tag(tag.id),
                    "trigger",
                    EntityRef::Trigger(tag.trigger),
                ));
            }
        }

        for trigger in self.triggers.iter_ordered() {
            if let Some(attached) = trigger.attached {
                if !self.triggers.contains(attached) {
                    return Err(dangling(
                        EntityRef::Trigger(trigger.id),
                        "attached trigger",
                        EntityRef::Trigger(attached),
                    ));
                }
            }
        }

        Ok(())
    }

    /// One-line collection counts
    pub fn summary(&self) -> String {
        format!(
            "{} houses, {} house types, {} task forces, {} team types, {} scripts, \
             {} triggers, {} tags, {} AI triggers, {} waypoints, {} local variables",
            self.houses.len(),
            self.house_types.len(),
            self.task_forces.len(),
            self.team_types.len(),
            self.scripts.len(),
            self.triggers.len(),
            self.tags.len(),
            self.ai_triggers.len(),
            self.waypoints.len(),
            self.local_variables.len(),
        )
    }
}

/// Documents compare by content only; allocator position, config and
/// captured logs are session state.
impl PartialEq for MapDocument {
    fn eq(&self, other: &Self) -> bool {
        self.houses == other.houses
            && self.house_types == other.house_types
            && self.task_forces == other.task_forces
            && self.team_types == other.team_types
            && self.scripts == other.scripts
            && self.triggers == other.triggers
            && self.tags == other.tags
            && self.ai_triggers == other.ai_triggers
            && self.waypoints == other.waypoints
            && self.local_variables == other.local_variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MapCell;

    #[test]
    fn test_insert_and_remove_by_ref() {
        let mut doc = MapDocument::new();
        let id = doc.allocator.allocate();
        doc.insert_entity(Entity::TaskForce(TaskForce::new(id, "TF1")))
            .unwrap();

        let target = EntityRef::TaskForce(id);
        assert!(doc.contains(target));
        assert_eq!(doc.entity_name(target).as_deref(), Some("TF1"));

        let removed = doc.remove_entity(target).unwrap();
        assert_eq!(removed.entity_ref(), target);
        assert!(matches!(
            doc.remove_entity(target),
            Err(EditError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_waypoint_keys_are_unique() {
        let mut doc = MapDocument::new();
        doc.insert_entity(Entity::Waypoint(Waypoint::new(3, MapCell::new(1, 1))))
            .unwrap();
        let again = doc.insert_entity(Entity::Waypoint(Waypoint::new(3, MapCell::new(2, 2))));
        assert!(matches!(again, Err(EditError::IntegrityViolation(_))));
    }

    #[test]
    fn test_seed_allocator_after_manual_inserts() {
        let mut doc = MapDocument::new();
        doc.insert_entity(Entity::Script(Script::new(EntityId::new(1_500_000), "S")))
            .unwrap();
        doc.seed_allocator();
        assert_eq!(doc.allocator.allocate(), EntityId::new(1_500_001));
    }

    #[test]
    fn test_check_integrity_reports_dangling_reference() {
        let mut doc = MapDocument::new();
        let team_id = doc.allocator.allocate();
        let missing = doc.allocator.allocate();
        doc.insert_entity(Entity::TeamType(
            TeamType::new(team_id, "TT").with_task_force(missing),
        ))
        .unwrap();
        assert!(matches!(
            doc.check_integrity(),
            Err(EditError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_equality_ignores_allocator() {
        let a = MapDocument::new();
        let b = MapDocument::new();
        b.allocator.allocate();
        assert_eq!(a, b);
    }
}
