//! Referential integrity resolver
//!
//! Deletes and renames go through here so that no reference field is left
//! pointing at an entity that is gone. Clearing always happens before the
//! physical removal, and every cleared field is recorded so the owning
//! mutation can restore it on revert.
//!
//! Rules:
//! - TaskForce deleted: `TeamType.task_force` cleared
//! - Script deleted: `TeamType.script` cleared
//! - Tag deleted: `TeamType.tag` cleared
//! - TeamType deleted: `AiTriggerType.primary_team` / `secondary_team` cleared
//! - HouseType deleted: `House.house_type` and `TeamType.house_type` cleared
//! - Waypoint deleted: `TeamType.waypoint` / `transport_waypoint` cleared
//! - Trigger deleted: its Tags are deleted, other triggers' `attached` cleared
//! - House deleted: its HouseType is deleted too when no other house uses it
//!
//! Name-keyed references (trigger parameters holding a house name, AI
//! trigger owners, alliance lists of other houses) are not rewritten.

use crate::core::{Entity, EntityId, EntityKind, EntityRef};
use crate::document::MapDocument;
use crate::edit::logger::VerbosityLevel;
use crate::{EditError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One id-typed reference field on one holder entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefSlot {
    HouseHouseType(EntityId),
    TeamTaskForce(EntityId),
    TeamScript(EntityId),
    TeamTag(EntityId),
    TeamHouseType(EntityId),
    TeamWaypoint(EntityId),
    TeamTransportWaypoint(EntityId),
    AiPrimaryTeam(EntityId),
    AiSecondaryTeam(EntityId),
    TriggerAttached(EntityId),
}

impl RefSlot {
    /// The entity that owns the field
    pub fn holder(&self) -> EntityRef {
        match *self {
            RefSlot::HouseHouseType(id) => EntityRef::House(id),
            RefSlot::TeamTaskForce(id)
            | RefSlot::TeamScript(id)
            | RefSlot::TeamTag(id)
            | RefSlot::TeamHouseType(id)
            | RefSlot::TeamWaypoint(id)
            | RefSlot::TeamTransportWaypoint(id) => EntityRef::TeamType(id),
            RefSlot::AiPrimaryTeam(id) | RefSlot::AiSecondaryTeam(id) => EntityRef::AiTrigger(id),
            RefSlot::TriggerAttached(id) => EntityRef::Trigger(id),
        }
    }

    /// Kind of entity the field may point at
    pub fn target_kind(&self) -> EntityKind {
        match self {
            RefSlot::HouseHouseType(_) | RefSlot::TeamHouseType(_) => EntityKind::HouseType,
            RefSlot::TeamTaskForce(_) => EntityKind::TaskForce,
            RefSlot::TeamScript(_) => EntityKind::Script,
            RefSlot::TeamTag(_) => EntityKind::Tag,
            RefSlot::TeamWaypoint(_) | RefSlot::TeamTransportWaypoint(_) => EntityKind::Waypoint,
            RefSlot::AiPrimaryTeam(_) | RefSlot::AiSecondaryTeam(_) => EntityKind::TeamType,
            RefSlot::TriggerAttached(_) => EntityKind::Trigger,
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            RefSlot::HouseHouseType(_) | RefSlot::TeamHouseType(_) => "house type",
            RefSlot::TeamTaskForce(_) => "task force",
            RefSlot::TeamScript(_) => "script",
            RefSlot::TeamTag(_) => "tag",
            RefSlot::TeamWaypoint(_) => "waypoint",
            RefSlot::TeamTransportWaypoint(_) => "transport waypoint",
            RefSlot::AiPrimaryTeam(_) => "primary team",
            RefSlot::AiSecondaryTeam(_) => "secondary team",
            RefSlot::TriggerAttached(_) => "attached trigger",
        }
    }

    /// Current value of the field
    pub fn get(&self, doc: &MapDocument) -> Result<Option<EntityRef>> {
        let missing = || EditError::EntityNotFound(self.holder());
        let value = match *self {
            RefSlot::HouseHouseType(id) => doc
                .houses
                .get(id)
                .ok_or_else(missing)?
                .house_type
                .map(EntityRef::HouseType),
            RefSlot::TeamTaskForce(id) => doc
                .team_types
                .get(id)
                .ok_or_else(missing)?
                .task_force
                .map(EntityRef::TaskForce),
            RefSlot::TeamScript(id) => doc
                .team_types
                .get(id)
                .ok_or_else(missing)?
                .script
                .map(EntityRef::Script),
            RefSlot::TeamTag(id) => doc
                .team_types
                .get(id)
                .ok_or_else(missing)?
                .tag
                .map(EntityRef::Tag),
            RefSlot::TeamHouseType(id) => doc
                .team_types
                .get(id)
                .ok_or_else(missing)?
                .house_type
                .map(EntityRef::HouseType),
            RefSlot::TeamWaypoint(id) => doc
                .team_types
                .get(id)
                .ok_or_else(missing)?
                .waypoint
                .map(EntityRef::Waypoint),
            RefSlot::TeamTransportWaypoint(id) => doc
                .team_types
                .get(id)
                .ok_or_else(missing)?
                .transport_waypoint
                .map(EntityRef::Waypoint),
            RefSlot::AiPrimaryTeam(id) => doc
                .ai_triggers
                .get(id)
                .ok_or_else(missing)?
                .primary_team
                .map(EntityRef::TeamType),
            RefSlot::AiSecondaryTeam(id) => doc
                .ai_triggers
                .get(id)
                .ok_or_else(missing)?
                .secondary_team
                .map(EntityRef::TeamType),
            RefSlot::TriggerAttached(id) => doc
                .triggers
                .get(id)
                .ok_or_else(missing)?
                .attached
                .map(EntityRef::Trigger),
        };
        Ok(value)
    }

    /// Overwrite the field; `value` must be of the slot's target kind
    pub fn set(&self, doc: &mut MapDocument, value: Option<EntityRef>) -> Result<()> {
        if let Some(v) = value {
            if v.kind() != self.target_kind() {
                return Err(EditError::InvalidInput(format!(
                    "{} cannot hold {v}",
                    self.field_name()
                )));
            }
        }
        let id = value.and_then(|v| v.entity_id());
        let waypoint = match value {
            Some(EntityRef::Waypoint(wp)) => Some(wp),
            _ => None,
        };
        let missing = EditError::EntityNotFound(self.holder());

        match *self {
            RefSlot::HouseHouseType(h) => doc.houses.get_mut(h).ok_or(missing)?.house_type = id,
            RefSlot::TeamTaskForce(t) => doc.team_types.get_mut(t).ok_or(missing)?.task_force = id,
            RefSlot::TeamScript(t) => doc.team_types.get_mut(t).ok_or(missing)?.script = id,
            RefSlot::TeamTag(t) => doc.team_types.get_mut(t).ok_or(missing)?.tag = id,
            RefSlot::TeamHouseType(t) => doc.team_types.get_mut(t).ok_or(missing)?.house_type = id,
            RefSlot::TeamWaypoint(t) => doc.team_types.get_mut(t).ok_or(missing)?.waypoint = waypoint,
            RefSlot::TeamTransportWaypoint(t) => {
                doc.team_types.get_mut(t).ok_or(missing)?.transport_waypoint = waypoint
            }
            RefSlot::AiPrimaryTeam(a) => doc.ai_triggers.get_mut(a).ok_or(missing)?.primary_team = id,
            RefSlot::AiSecondaryTeam(a) => {
                doc.ai_triggers.get_mut(a).ok_or(missing)?.secondary_team = id
            }
            RefSlot::TriggerAttached(t) => doc.triggers.get_mut(t).ok_or(missing)?.attached = id,
        }
        Ok(())
    }
}

impl fmt::Display for RefSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.holder(), self.field_name())
    }
}

/// A reference field the resolver cleared, with the value it held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedRef {
    pub slot: RefSlot,
    pub previous: EntityRef,
}

/// Every reference field currently pointing at `target`
pub fn references_to(doc: &MapDocument, target: EntityRef) -> Vec<RefSlot> {
    let mut slots = Vec::new();
    match target {
        EntityRef::TaskForce(id) => {
            for team in doc.team_types.iter_ordered() {
                if team.task_force == Some(id) {
                    slots.push(RefSlot::TeamTaskForce(team.id));
                }
            }
        }
        EntityRef::Script(id) => {
            for team in doc.team_types.iter_ordered() {
                if team.script == Some(id) {
                    slots.push(RefSlot::TeamScript(team.id));
                }
            }
        }
        EntityRef::Tag(id) => {
            for team in doc.team_types.iter_ordered() {
                if team.tag == Some(id) {
                    slots.push(RefSlot::TeamTag(team.id));
                }
            }
        }
        EntityRef::TeamType(id) => {
            for ai in doc.ai_triggers.iter_ordered() {
                if ai.primary_team == Some(id) {
                    slots.push(RefSlot::AiPrimaryTeam(ai.id));
                }
                if ai.secondary_team == Some(id) {
                    slots.push(RefSlot::AiSecondaryTeam(ai.id));
                }
            }
        }
        EntityRef::HouseType(id) => {
            for house in doc.houses.iter_ordered() {
                if house.house_type == Some(id) {
                    slots.push(RefSlot::HouseHouseType(house.id));
                }
            }
            for team in doc.team_types.iter_ordered() {
                if team.house_type == Some(id) {
                    slots.push(RefSlot::TeamHouseType(team.id));
                }
            }
        }
        EntityRef::Waypoint(wp) => {
            for team in doc.team_types.iter_ordered() {
                if team.waypoint == Some(wp) {
                    slots.push(RefSlot::TeamWaypoint(team.id));
                }
                if team.transport_waypoint == Some(wp) {
                    slots.push(RefSlot::TeamTransportWaypoint(team.id));
                }
            }
        }
        EntityRef::Trigger(id) => {
            for trigger in doc.triggers.iter_ordered() {
                if trigger.attached == Some(id) {
                    slots.push(RefSlot::TriggerAttached(trigger.id));
                }
            }
        }
        EntityRef::House(_) | EntityRef::AiTrigger(_) | EntityRef::LocalVariable(_) => {}
    }
    slots
}

/// Null out every reference to `target`, returning what was cleared
///
/// Idempotent: once cleared, a second call finds nothing and returns an
/// empty list.
pub fn on_entity_will_be_deleted(doc: &mut MapDocument, target: EntityRef) -> Result<Vec<ClearedRef>> {
    let mut cleared = Vec::new();
    for slot in references_to(doc, target) {
        slot.set(doc, None)?;
        doc.logger.categorized(
            VerbosityLevel::Verbose,
            "integrity",
            &format!("Cleared {slot} (was {target})"),
        );
        cleared.push(ClearedRef {
            slot,
            previous: target,
        });
    }
    Ok(cleared)
}

/// Put cleared references back, newest first
///
/// The referenced entities must already be back in the document.
pub fn restore(doc: &mut MapDocument, cleared: &[ClearedRef]) -> Result<()> {
    for c in cleared.iter().rev() {
        if !doc.contains(c.previous) {
            return Err(EditError::IntegrityViolation(format!(
                "cannot restore {} to missing {}",
                c.slot, c.previous
            )));
        }
        c.slot.set(doc, Some(c.previous))?;
    }
    Ok(())
}

/// Rewrite name-keyed self references after a rename
///
/// For a house this rewrites its own alliance-list entry. Other entities
/// holding the old name (trigger parameters, AI trigger owners, other
/// houses' alliances) keep it.
pub fn on_entity_renamed(
    doc: &mut MapDocument,
    target: EntityRef,
    old_name: &str,
    new_name: &str,
) -> Result<()> {
    if let EntityRef::House(id) = target {
        let house = doc
            .houses
            .get_mut(id)
            .ok_or(EditError::EntityNotFound(target))?;
        for ally in house.alliances.iter_mut() {
            if ally == old_name {
                *ally = new_name.to_string();
            }
        }
    }
    Ok(())
}

/// Reject deletions that would orphan other owners
pub fn check_deletable(doc: &MapDocument, target: EntityRef) -> Result<()> {
    if !doc.contains(target) {
        return Err(EditError::EntityNotFound(target));
    }
    if let EntityRef::HouseType(id) = target {
        let owners = doc.house_type_owners(id).len();
        if owners > 0 {
            return Err(EditError::SharedDependent { target, owners });
        }
    }
    Ok(())
}

/// Entities removed by one deletion, in removal order
///
/// With `cascade_owned`, a house's house type is included when no other
/// house uses it. Tags always follow their trigger.
pub fn deletion_plan(doc: &MapDocument, target: EntityRef, cascade_owned: bool) -> Vec<EntityRef> {
    let mut plan = Vec::new();
    match target {
        EntityRef::House(id) => {
            plan.push(target);
            if cascade_owned {
                if let Some(ht) = doc.houses.get(id).and_then(|h| h.house_type) {
                    if doc.house_type_owners(ht) == [id] {
                        plan.push(EntityRef::HouseType(ht));
                    }
                }
            }
        }
        EntityRef::Trigger(id) => {
            plan.extend(
                doc.tags
                    .iter_ordered()
                    .filter(|t| t.trigger == id)
                    .map(|t| EntityRef::Tag(t.id)),
            );
            plan.push(target);
        }
        _ => plan.push(target),
    }
    plan
}

/// One removed entity and the references cleared just before it went
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalStep {
    pub entity: Entity,
    pub cleared: Vec<ClearedRef>,
}

/// Snapshot of a (possibly cascading) deletion, enough to undo it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Removal {
    pub steps: Vec<RemovalStep>,
}

impl Removal {
    /// Everything removed, in removal order
    pub fn removed(&self) -> Vec<EntityRef> {
        self.steps.iter().map(|s| s.entity.entity_ref()).collect()
    }

    pub fn cleared_count(&self) -> usize {
        self.steps.iter().map(|s| s.cleared.len()).sum()
    }
}

/// Error for a failed edit whose rollback failed too
///
/// The document may be half restored at this point, so neither error alone
/// tells the caller enough.
pub(crate) fn rollback_failed(what: &str, cause: EditError, rollback: EditError) -> EditError {
    EditError::IntegrityViolation(format!(
        "{what}: {cause}; rolling back also failed: {rollback}"
    ))
}

/// Clear references to, then remove, `target` and its cascade
///
/// On failure the steps already taken are rolled back before the error is
/// returned.
pub fn delete_with_cascade(
    doc: &mut MapDocument,
    target: EntityRef,
    cascade_owned: bool,
) -> Result<Removal> {
    let plan = deletion_plan(doc, target, cascade_owned);
    let mut removal = Removal::default();

    for step in plan {
        match remove_one(doc, step) {
            Ok(done) => removal.steps.push(done),
            Err(e) => {
                if let Err(rollback) = undo_removal(doc, &removal) {
                    return Err(rollback_failed(&format!("deleting {target}"), e, rollback));
                }
                return Err(e);
            }
        }
    }
    Ok(removal)
}

fn remove_one(doc: &mut MapDocument, target: EntityRef) -> Result<RemovalStep> {
    let cleared = on_entity_will_be_deleted(doc, target)?;
    let entity = match doc.remove_entity(target) {
        Ok(entity) => entity,
        Err(_) => {
            restore(doc, &cleared)?;
            return Err(EditError::IntegrityViolation(format!(
                "{target} vanished during deletion"
            )));
        }
    };
    doc.logger.categorized(
        VerbosityLevel::Verbose,
        "integrity",
        &format!("Removed {target}"),
    );
    Ok(RemovalStep { entity, cleared })
}

/// Re-insert removed entities and restore their references, newest first
pub fn undo_removal(doc: &mut MapDocument, removal: &Removal) -> Result<()> {
    for step in removal.steps.iter().rev() {
        doc.insert_entity(step.entity.clone())?;
        restore(doc, &step.cleared)?;
    }
    Ok(())
}
