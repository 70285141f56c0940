//! mapedit - document edit core for a tile-based RTS map editor
//!
//! Holds the in-memory entity graph of a map (houses, task forces, team
//! types, scripts, triggers, AI triggers, waypoints) and the machinery
//! that edits it: reversible mutations with undo/redo, a referential
//! integrity resolver, a usage scanner, and a cascading difficulty clone.

pub mod config;
pub mod core;
pub mod document;
pub mod edit;
pub mod error;
pub mod snapshot;
pub mod undo;

pub use config::EditorConfig;
pub use document::MapDocument;
pub use error::{EditError, Result};
pub use undo::{Mutation, MutationEngine};
