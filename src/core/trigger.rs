//! Triggers and the tags that place them on the map

use crate::core::{DocEntity, EntityId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A trigger condition: kind code plus untyped parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub kind: u32,
    pub params: SmallVec<[String; 2]>,
}

impl TriggerEvent {
    pub fn new<I, S>(kind: u32, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TriggerEvent {
            kind,
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

/// A trigger effect: kind code plus untyped parameters
///
/// The stock format stores seven slots; the last one holds a waypoint in
/// alphabetical encoding for actions that take a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAction {
    pub kind: u32,
    pub params: SmallVec<[String; 7]>,
}

impl TriggerAction {
    pub fn new<I, S>(kind: u32, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TriggerAction {
            kind,
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: EntityId,
    pub name: String,

    /// Owning house, by name
    pub house: String,

    /// Trigger fired alongside this one
    pub attached: Option<EntityId>,

    pub disabled: bool,
    pub easy: bool,
    pub medium: bool,
    pub hard: bool,

    pub events: Vec<TriggerEvent>,
    pub actions: Vec<TriggerAction>,
}

impl Trigger {
    pub fn new(id: EntityId, name: impl Into<String>, house: impl Into<String>) -> Self {
        Trigger {
            id,
            name: name.into(),
            house: house.into(),
            attached: None,
            disabled: false,
            easy: true,
            medium: true,
            hard: true,
            events: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: TriggerEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_action(mut self, action: TriggerAction) -> Self {
        self.actions.push(action);
        self
    }
}

impl DocEntity for Trigger {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// How often a tag may fire its trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagRepeat {
    #[default]
    OneTimeOr,
    OneTimeAnd,
    Repeating,
}

/// Links a trigger to placements on the map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: EntityId,
    pub name: String,
    pub repeat: TagRepeat,
    pub trigger: EntityId,
}

impl Tag {
    pub fn new(id: EntityId, name: impl Into<String>, trigger: EntityId) -> Self {
        Tag {
            id,
            name: name.into(),
            repeat: TagRepeat::default(),
            trigger,
        }
    }
}

impl DocEntity for Tag {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
