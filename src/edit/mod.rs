//! Edit operations over a `MapDocument`

pub mod difficulty;
pub mod integrity;
pub mod logger;
pub mod mutations;
pub mod params;
pub mod usage;

pub use difficulty::{clone_for_easier_difficulties, derive_name, CloneReport};
pub use integrity::{ClearedRef, RefSlot, Removal};
pub use logger::{EditLogger, LogEntry, OutputMode, VerbosityLevel};
pub use mutations::{
    new_house, unused_clone_name, AddEntity, Batch, Deferred, DeleteEntity, EditScript,
    EditTaskForce, EntryOp, MoveWaypoint, RenameHouse, ScriptOp, SetReference,
};
pub use params::{ParamCatalog, ParamKind};
pub use usage::{find_usage_strings, find_usages, Usage};
