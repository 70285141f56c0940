//! Error types for the map edit core

use crate::core::EntityRef;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityRef),

    /// A reference resolved to a missing entity, or an id was reused.
    /// Always a programming error upstream of the core.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Waypoint {0} already exists")]
    DuplicateWaypoint(u32),

    #[error("{target} is still used by {owners} other owner(s)")]
    SharedDependent { target: EntityRef, owners: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for EditError {
    fn from(e: serde_json::Error) -> Self {
        EditError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EditError>;
