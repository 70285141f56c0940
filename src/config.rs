//! Editor configuration
//!
//! Every field has a default, so a config file only needs the values it
//! overrides.

use crate::core::Difficulty;
use crate::edit::params::ParamCatalog;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name tokens substituted when deriving per-difficulty clone names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTokens {
    pub easy: String,
    pub medium: String,
    pub hard: String,
}

impl DifficultyTokens {
    pub fn token(&self, difficulty: Difficulty) -> &str {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }
}

impl Default for DifficultyTokens {
    fn default() -> Self {
        DifficultyTokens {
            easy: "Easy".to_string(),
            medium: "Medium".to_string(),
            hard: "Hard".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Waypoint numbers must be below this
    pub max_waypoints: u32,

    pub max_task_force_slots: usize,

    pub max_script_actions: usize,

    /// Oldest undo entries are dropped beyond this depth (None = unbounded)
    pub history_limit: Option<usize>,

    pub difficulty_tokens: DifficultyTokens,

    pub params: ParamCatalog,
}

impl EditorConfig {
    /// Load a JSON config file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            // Two-letter alphabetical encoding tops out at "ZZ" = 701
            max_waypoints: 702,
            max_task_force_slots: 6,
            max_script_actions: 50,
            history_limit: None,
            difficulty_tokens: DifficultyTokens::default(),
            params: ParamCatalog::default(),
        }
    }
}
