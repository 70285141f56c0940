//! Parameter-type metadata for trigger and script parameters
//!
//! Trigger and script parameters are stored as untyped values. Their meaning
//! (waypoint, local variable, team type key, house name, ...) depends on the
//! event/action kind and the slot index, and is looked up here.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// What a parameter slot refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParamKind {
    /// Slot carries no reference
    #[default]
    Plain,
    /// Waypoint number in decimal
    Waypoint,
    /// Waypoint number in letter encoding (A, B, ..., AA)
    WaypointAlpha,
    LocalVariable,
    TeamType,
    TaskForce,
    Trigger,
    Tag,
    /// House, by name
    House,
}

/// Slot index of the alphabetical waypoint in a trigger action
pub const ACTION_WAYPOINT_SLOT: usize = 6;

/// Side table mapping (kind code, slot) to a `ParamKind`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamCatalog {
    pub events: FxHashMap<u32, Vec<ParamKind>>,
    pub actions: FxHashMap<u32, Vec<ParamKind>>,
    pub script_actions: FxHashMap<u32, ParamKind>,
}

impl ParamCatalog {
    /// A catalog with no entries; every slot is `Plain`
    pub fn empty() -> Self {
        ParamCatalog {
            events: FxHashMap::default(),
            actions: FxHashMap::default(),
            script_actions: FxHashMap::default(),
        }
    }

    pub fn event_param(&self, kind: u32, slot: usize) -> ParamKind {
        lookup(&self.events, kind, slot)
    }

    pub fn action_param(&self, kind: u32, slot: usize) -> ParamKind {
        lookup(&self.actions, kind, slot)
    }

    pub fn script_param(&self, action: u32) -> ParamKind {
        self.script_actions
            .get(&action)
            .copied()
            .unwrap_or_default()
    }

    /// Register (or replace) the slot layout of a trigger event
    pub fn register_event(&mut self, kind: u32, slots: Vec<ParamKind>) {
        self.events.insert(kind, slots);
    }

    /// Register (or replace) the slot layout of a trigger action
    pub fn register_action(&mut self, kind: u32, slots: Vec<ParamKind>) {
        self.actions.insert(kind, slots);
    }

    pub fn register_script_action(&mut self, action: u32, kind: ParamKind) {
        self.script_actions.insert(action, kind);
    }
}

fn lookup(table: &FxHashMap<u32, Vec<ParamKind>>, kind: u32, slot: usize) -> ParamKind {
    table
        .get(&kind)
        .and_then(|slots| slots.get(slot))
        .copied()
        .unwrap_or_default()
}

/// Action slot layout: `params` for the leading slots, waypoint in slot 6
fn with_waypoint(mut params: Vec<ParamKind>) -> Vec<ParamKind> {
    params.resize(ACTION_WAYPOINT_SLOT, ParamKind::Plain);
    params.push(ParamKind::WaypointAlpha);
    params
}

impl Default for ParamCatalog {
    /// The stock Red Alert 2 / Yuri's Revenge layout for the kinds that
    /// carry references
    fn default() -> Self {
        use ParamKind::*;

        let mut catalog = ParamCatalog::empty();

        // Events: slot 0 is the parameter-type code, slot 1 the value
        catalog.register_event(1, vec![Plain, House]); // Entered by
        catalog.register_event(4, vec![Plain, House]); // Destroyed, units, all
        catalog.register_event(19, vec![Plain, House]); // Any event by house
        catalog.register_event(36, vec![Plain, LocalVariable]); // Local is set
        catalog.register_event(37, vec![Plain, LocalVariable]); // Local is clear
        catalog.register_event(51, vec![Plain, Waypoint]); // Object enters waypoint area
        catalog.register_event(55, vec![Plain, Trigger]); // Attached trigger fired

        // Actions
        catalog.register_action(4, vec![Plain, TeamType]); // Create team
        catalog.register_action(5, vec![Plain, TeamType]); // Destroy team
        catalog.register_action(7, with_waypoint(vec![Plain, TeamType])); // Reinforcement at waypoint
        catalog.register_action(12, vec![Plain, Trigger]); // Destroy trigger
        catalog.register_action(16, with_waypoint(vec![])); // Reveal around waypoint
        catalog.register_action(22, vec![Plain, Trigger]); // Force trigger
        catalog.register_action(48, with_waypoint(vec![])); // Center camera at waypoint
        catalog.register_action(53, vec![Plain, Trigger]); // Enable trigger
        catalog.register_action(54, vec![Plain, Trigger]); // Disable trigger
        catalog.register_action(56, vec![Plain, LocalVariable]); // Set local
        catalog.register_action(57, vec![Plain, LocalVariable]); // Clear local
        catalog.register_action(75, vec![Plain, House]); // Make ally
        catalog.register_action(80, with_waypoint(vec![Plain, TeamType])); // Chrono reinforcement
        catalog.register_action(107, vec![Plain, Tag]); // Destroy tag
        catalog.register_action(112, vec![Plain, Waypoint]); // Ion storm at waypoint
        catalog.register_action(125, vec![Plain, TaskForce]); // Create task force team

        // Script actions
        catalog.register_script_action(1, Waypoint); // Attack waypoint
        catalog.register_script_action(3, Waypoint); // Move to waypoint
        catalog.register_script_action(16, Waypoint); // Patrol to waypoint
        catalog.register_script_action(56, Plain); // Set global
        catalog.register_script_action(58, LocalVariable); // Set local
        catalog.register_script_action(59, LocalVariable); // Clear local

        catalog
    }
}
