//! Core document types and entities

pub mod ai_trigger;
pub mod entity;
pub mod house;
pub mod kind;
pub mod script;
pub mod task_force;
pub mod team_type;
pub mod trigger;
pub mod waypoint;

pub use ai_trigger::{
    AiCondition, AiConditionKind, AiTriggerType, Comparator, Difficulties, Difficulty,
};
pub use entity::{DocEntity, EntityId, EntityStore, IdAllocator, WaypointId, FIRST_ENTITY_ID};
pub use house::{House, HouseType};
pub use kind::{Entity, EntityKind, EntityRef};
pub use script::{Script, ScriptAction};
pub use task_force::{TaskForce, TaskForceEntry};
pub use team_type::{TeamFlags, TeamType};
pub use trigger::{Tag, TagRepeat, Trigger, TriggerAction, TriggerEvent};
pub use waypoint::{alpha_to_waypoint, waypoint_to_alpha, LocalVariable, MapCell, Waypoint};
