//! Usage scanner: where is an entity referenced?
//!
//! Read-only. Trigger and script parameters are untyped, so each slot is
//! interpreted through the `ParamCatalog` before it is compared.

use crate::core::{alpha_to_waypoint, EntityId, EntityRef, Trigger};
use crate::document::MapDocument;
use crate::edit::params::{ParamCatalog, ParamKind};
use std::fmt;

/// One place that refers to the scanned entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub holder: EntityRef,
    pub holder_name: String,
    /// Field or parameter position, e.g. "task force" or "action 2 param 6"
    pub location: String,
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' ({})",
            self.holder, self.holder_name, self.location
        )
    }
}

/// Does one untyped parameter, read as `kind`, point at `target`?
fn param_matches(doc: &MapDocument, kind: ParamKind, value: &str, target: EntityRef) -> bool {
    let value = value.trim();
    match (kind, target) {
        (ParamKind::Waypoint, EntityRef::Waypoint(wp)) => {
            value.parse::<u32>().ok() == Some(wp.as_u32())
        }
        (ParamKind::WaypointAlpha, EntityRef::Waypoint(wp)) => {
            alpha_to_waypoint(value) == Some(wp.as_u32())
        }
        (ParamKind::LocalVariable, EntityRef::LocalVariable(index)) => {
            value.parse::<u32>().ok() == Some(index)
        }
        (ParamKind::TeamType, EntityRef::TeamType(id))
        | (ParamKind::TaskForce, EntityRef::TaskForce(id))
        | (ParamKind::Trigger, EntityRef::Trigger(id))
        | (ParamKind::Tag, EntityRef::Tag(id)) => id_param_matches(value, id),
        (ParamKind::House, EntityRef::House(id)) => doc
            .houses
            .get(id)
            .is_some_and(|h| h.name == value),
        _ => false,
    }
}

fn id_param_matches(value: &str, id: EntityId) -> bool {
    EntityId::parse_key(value) == Some(id)
}

fn scan_trigger_params(
    doc: &MapDocument,
    catalog: &ParamCatalog,
    trigger: &Trigger,
    target: EntityRef,
    out: &mut Vec<Usage>,
) {
    let mut push = |location: String| {
        out.push(Usage {
            holder: EntityRef::Trigger(trigger.id),
            holder_name: trigger.name.clone(),
            location,
        })
    };

    for (e, event) in trigger.events.iter().enumerate() {
        for (slot, value) in event.params.iter().enumerate() {
            let kind = catalog.event_param(event.kind, slot);
            if param_matches(doc, kind, value, target) {
                push(format!("event {} param {slot}", e + 1));
            }
        }
    }
    for (a, action) in trigger.actions.iter().enumerate() {
        for (slot, value) in action.params.iter().enumerate() {
            let kind = catalog.action_param(action.kind, slot);
            if param_matches(doc, kind, value, target) {
                push(format!("action {} param {slot}", a + 1));
            }
        }
    }
}

/// Every place `target` is referenced, ordered by holder kind then id
///
/// An entity nobody refers to yields an empty list.
pub fn find_usages(doc: &MapDocument, target: EntityRef) -> Vec<Usage> {
    let catalog = &doc.config.params;
    let mut usages = Vec::new();

    let direct = |holder: EntityRef, name: &str, location: &str| Usage {
        holder,
        holder_name: name.to_string(),
        location: location.to_string(),
    };

    // Direct id fields
    match target {
        EntityRef::TaskForce(id) => {
            for team in doc.team_types.iter_ordered() {
                if team.task_force == Some(id) {
                    usages.push(direct(EntityRef::TeamType(team.id), &team.name, "task force"));
                }
            }
        }
        EntityRef::Script(id) => {
            for team in doc.team_types.iter_ordered() {
                if team.script == Some(id) {
                    usages.push(direct(EntityRef::TeamType(team.id), &team.name, "script"));
                }
            }
        }
        EntityRef::Tag(id) => {
            for team in doc.team_types.iter_ordered() {
                if team.tag == Some(id) {
                    usages.push(direct(EntityRef::TeamType(team.id), &team.name, "tag"));
                }
            }
        }
        EntityRef::Waypoint(wp) => {
            for team in doc.team_types.iter_ordered() {
                let holder = EntityRef::TeamType(team.id);
                if team.waypoint == Some(wp) {
                    usages.push(direct(holder, &team.name, "waypoint"));
                }
                if team.transport_waypoint == Some(wp) {
                    usages.push(direct(holder, &team.name, "transport waypoint"));
                }
            }
        }
        EntityRef::HouseType(id) => {
            for house in doc.houses.iter_ordered() {
                if house.house_type == Some(id) {
                    usages.push(direct(EntityRef::House(house.id), &house.name, "house type"));
                }
            }
            for team in doc.team_types.iter_ordered() {
                if team.house_type == Some(id) {
                    usages.push(direct(EntityRef::TeamType(team.id), &team.name, "house type"));
                }
            }
        }
        EntityRef::Trigger(id) => {
            for tag in doc.tags.iter_ordered() {
                if tag.trigger == id {
                    usages.push(direct(EntityRef::Tag(tag.id), &tag.name, "trigger"));
                }
            }
            for trigger in doc.triggers.iter_ordered() {
                if trigger.attached == Some(id) && trigger.id != id {
                    usages.push(direct(
                        EntityRef::Trigger(trigger.id),
                        &trigger.name,
                        "attached trigger",
                    ));
                }
            }
        }
        EntityRef::House(id) => {
            if let Some(house) = doc.houses.get(id) {
                for other in doc.houses.iter_ordered() {
                    if other.id != id && other.is_allied_with(&house.name) {
                        usages.push(direct(EntityRef::House(other.id), &other.name, "alliances"));
                    }
                }
                for trigger in doc.triggers.iter_ordered() {
                    if trigger.house == house.name {
                        usages.push(direct(
                            EntityRef::Trigger(trigger.id),
                            &trigger.name,
                            "house",
                        ));
                    }
                }
                for ai in doc.ai_triggers.iter_ordered() {
                    if ai.owner == house.name {
                        usages.push(direct(EntityRef::AiTrigger(ai.id), &ai.name, "owner"));
                    }
                }
            }
        }
        EntityRef::TeamType(_)
        | EntityRef::AiTrigger(_)
        | EntityRef::LocalVariable(_) => {}
    }

    // Trigger parameters
    for trigger in doc.triggers.iter_ordered() {
        scan_trigger_params(doc, catalog, trigger, target, &mut usages);
    }

    // Script arguments
    if matches!(target, EntityRef::Waypoint(_) | EntityRef::LocalVariable(_)) {
        for script in doc.scripts.iter_ordered() {
            for (line, action) in script.actions.iter().enumerate() {
                let kind = catalog.script_param(action.action);
                if param_matches(doc, kind, &action.argument.to_string(), target) {
                    usages.push(direct(
                        EntityRef::Script(script.id),
                        &script.name,
                        &format!("line {}", line + 1),
                    ));
                }
            }
        }
    }

    // AI trigger team slots
    if let EntityRef::TeamType(id) = target {
        for ai in doc.ai_triggers.iter_ordered() {
            if ai.primary_team == Some(id) {
                usages.push(direct(EntityRef::AiTrigger(ai.id), &ai.name, "primary team"));
            }
            if ai.secondary_team == Some(id) {
                usages.push(direct(EntityRef::AiTrigger(ai.id), &ai.name, "secondary team"));
            }
        }
    }

    usages
}

/// `find_usages` rendered as display lines
pub fn find_usage_strings(doc: &MapDocument, target: EntityRef) -> Vec<String> {
    find_usages(doc, target)
        .iter()
        .map(Usage::to_string)
        .collect()
}
