//! AI trigger types: when and how the computer opponent builds a team

use crate::core::{DocEntity, EntityId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Tiers strictly easier than this one, hardest first
    pub fn easier(&self) -> &'static [Difficulty] {
        match self {
            Difficulty::Hard => &[Difficulty::Medium, Difficulty::Easy],
            Difficulty::Medium => &[Difficulty::Easy],
            Difficulty::Easy => &[],
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

/// Per-difficulty enable flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difficulties {
    pub easy: bool,
    pub medium: bool,
    pub hard: bool,
}

impl Difficulties {
    pub fn all() -> Self {
        Difficulties {
            easy: true,
            medium: true,
            hard: true,
        }
    }

    /// Enabled for exactly one tier
    pub fn only(difficulty: Difficulty) -> Self {
        Difficulties {
            easy: difficulty == Difficulty::Easy,
            medium: difficulty == Difficulty::Medium,
            hard: difficulty == Difficulty::Hard,
        }
    }

    pub fn is_enabled(&self, difficulty: Difficulty) -> bool {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

impl Default for Difficulties {
    fn default() -> Self {
        Self::all()
    }
}

/// What the AI trigger watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiConditionKind {
    #[default]
    None,
    EnemyOwns,
    HouseOwns,
    EnemyLowPower,
    EnemyHighPower,
    EnemyCredits,
    IronCurtainReady,
    ChronosphereReady,
    CivilianOwns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comparator {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
    #[default]
    NotEqual,
}

impl Comparator {
    pub fn holds(&self, lhs: u32, rhs: u32) -> bool {
        match self {
            Comparator::Less => lhs < rhs,
            Comparator::LessOrEqual => lhs <= rhs,
            Comparator::Equal => lhs == rhs,
            Comparator::GreaterOrEqual => lhs >= rhs,
            Comparator::Greater => lhs > rhs,
            Comparator::NotEqual => lhs != rhs,
        }
    }
}

/// Condition / comparator / quantity triple
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AiCondition {
    pub kind: AiConditionKind,
    pub comparator: Comparator,
    pub quantity: u32,
    /// Object type the condition counts, if any
    pub object: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiTriggerType {
    pub id: EntityId,
    pub name: String,

    /// Owning house name, or `<all>` / `<none>`
    pub owner: String,
    /// Side restriction (0 = any)
    pub side: u8,

    pub primary_team: Option<EntityId>,
    pub secondary_team: Option<EntityId>,

    pub condition: AiCondition,
    pub weight: f32,
    pub min_weight: f32,
    pub max_weight: f32,
    pub base_defense: bool,
    pub skirmish: bool,
    pub enabled: Difficulties,
}

impl AiTriggerType {
    pub fn new(id: EntityId, name: impl Into<String>, owner: impl Into<String>) -> Self {
        AiTriggerType {
            id,
            name: name.into(),
            owner: owner.into(),
            side: 0,
            primary_team: None,
            secondary_team: None,
            condition: AiCondition::default(),
            weight: 50.0,
            min_weight: 30.0,
            max_weight: 50.0,
            base_defense: false,
            skirmish: true,
            enabled: Difficulties::all(),
        }
    }

    pub fn with_primary(mut self, team: EntityId) -> Self {
        self.primary_team = Some(team);
        self
    }

    pub fn with_secondary(mut self, team: EntityId) -> Self {
        self.secondary_team = Some(team);
        self
    }
}

impl DocEntity for AiTriggerType {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_enables_one_tier() {
        let flags = Difficulties::only(Difficulty::Medium);
        assert!(flags.is_enabled(Difficulty::Medium));
        assert!(!flags.is_enabled(Difficulty::Easy));
        assert!(!flags.is_enabled(Difficulty::Hard));
    }

    #[test]
    fn test_easier_tiers() {
        assert_eq!(
            Difficulty::Hard.easier(),
            &[Difficulty::Medium, Difficulty::Easy]
        );
        assert!(Difficulty::Easy.easier().is_empty());
    }

    #[test]
    fn test_comparator() {
        assert!(Comparator::Less.holds(1, 2));
        assert!(!Comparator::NotEqual.holds(3, 3));
    }
}
