//! Cascading difficulty clone
//!
//! Turns a Hard AI trigger into one trigger per difficulty tier. The team
//! types and task forces behind it are cloned for each easier tier, or
//! reused when an entity with the derived name already exists. The run
//! writes straight into the document and is not recorded in the history.

use crate::core::{AiTriggerType, Difficulties, Difficulty, EntityId, EntityRef};
use crate::document::MapDocument;
use crate::edit::logger::VerbosityLevel;
use crate::{EditError, Result};
use std::fmt;

/// Name of the `to` tier copy of an entity called `name`
///
/// The last occurrence of `from` is replaced by `to`. A name without `from`
/// gets `to` appended after a space.
pub fn derive_name(name: &str, from: &str, to: &str) -> String {
    if !from.is_empty() {
        if let Some(pos) = name.rfind(from) {
            let mut derived = String::with_capacity(name.len() + to.len());
            derived.push_str(&name[..pos]);
            derived.push_str(to);
            derived.push_str(&name[pos + from.len()..]);
            return derived;
        }
    }
    format!("{name} {to}")
}

/// What one clone run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneReport {
    pub source: Option<EntityId>,
    pub created_ai_triggers: Vec<EntityId>,
    pub created_team_types: Vec<EntityId>,
    pub reused_team_types: Vec<EntityId>,
    pub created_task_forces: Vec<EntityId>,
    pub reused_task_forces: Vec<EntityId>,
}

impl fmt::Display for CloneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} AI triggers created; team types: {} created, {} reused; \
             task forces: {} created, {} reused",
            self.created_ai_triggers.len(),
            self.created_team_types.len(),
            self.reused_team_types.len(),
            self.created_task_forces.len(),
            self.reused_task_forces.len(),
        )
    }
}

/// Clone engine bound to one document
struct DifficultyCloner<'a> {
    doc: &'a mut MapDocument,
    report: CloneReport,
}

impl<'a> DifficultyCloner<'a> {
    fn tokens(&self, to: Difficulty) -> (String, String) {
        let tokens = &self.doc.config.difficulty_tokens;
        (
            tokens.token(Difficulty::Hard).to_string(),
            tokens.token(to).to_string(),
        )
    }

    fn log(&self, message: &str) {
        self.doc
            .logger
            .categorized(VerbosityLevel::Normal, "clone", message);
    }

    /// Existing task force with the derived name, or a fresh copy
    fn task_force_for(&mut self, source: EntityId, tier: Difficulty) -> Result<EntityId> {
        let (from, to) = self.tokens(tier);
        let original = self
            .doc
            .task_forces
            .get(source)
            .ok_or(EditError::EntityNotFound(EntityRef::TaskForce(source)))?;
        let name = derive_name(&original.name, &from, &to);

        if let Some(existing) = self.doc.task_forces.find_by_name(&name) {
            let id = existing.id;
            self.log(&format!("Reusing task force '{name}'"));
            self.report.reused_task_forces.push(id);
            return Ok(id);
        }

        let mut copy = original.clone();
        copy.id = self.doc.allocator.allocate();
        copy.name = name;
        let id = copy.id;
        self.log(&format!("Created task force '{}'", copy.name));
        self.doc.task_forces.insert(copy)?;
        self.report.created_task_forces.push(id);
        Ok(id)
    }

    /// Existing team type with the derived name, or a fresh copy whose task
    /// force is resolved the same way
    fn team_type_for(&mut self, source: EntityId, tier: Difficulty) -> Result<EntityId> {
        let (from, to) = self.tokens(tier);
        let original = self
            .doc
            .team_types
            .get(source)
            .ok_or(EditError::EntityNotFound(EntityRef::TeamType(source)))?;
        let name = derive_name(&original.name, &from, &to);

        if let Some(existing) = self.doc.team_types.find_by_name(&name) {
            let id = existing.id;
            self.log(&format!("Reusing team type '{name}'"));
            self.report.reused_team_types.push(id);
            return Ok(id);
        }

        let mut copy = original.clone();
        copy.id = self.doc.allocator.allocate();
        copy.name = name;
        if let Some(tf) = copy.task_force {
            copy.task_force = Some(self.task_force_for(tf, tier)?);
        }
        let id = copy.id;
        self.log(&format!("Created team type '{}'", copy.name));
        self.doc.team_types.insert(copy)?;
        self.report.created_team_types.push(id);
        Ok(id)
    }

    fn ai_trigger_for(&mut self, source: &AiTriggerType, tier: Difficulty) -> Result<EntityId> {
        let (from, to) = self.tokens(tier);
        let mut copy = source.clone();
        copy.id = self.doc.allocator.allocate();
        copy.name = derive_name(&source.name, &from, &to);
        copy.enabled = Difficulties::only(tier);
        if let Some(team) = source.primary_team {
            copy.primary_team = Some(self.team_type_for(team, tier)?);
        }
        if let Some(team) = source.secondary_team {
            copy.secondary_team = Some(self.team_type_for(team, tier)?);
        }
        let id = copy.id;
        self.log(&format!("Created AI trigger '{}' ({tier})", copy.name));
        self.doc.ai_triggers.insert(copy)?;
        self.report.created_ai_triggers.push(id);
        Ok(id)
    }
}

/// Every team type and task force a clone run will read must exist
fn check_sources(doc: &MapDocument, source: &AiTriggerType) -> Result<()> {
    for team in [source.primary_team, source.secondary_team].into_iter().flatten() {
        let team_type = doc
            .team_types
            .get(team)
            .ok_or_else(|| {
                EditError::IntegrityViolation(format!(
                    "AI trigger '{}' points at missing {}",
                    source.name,
                    EntityRef::TeamType(team)
                ))
            })?;
        if let Some(tf) = team_type.task_force {
            if !doc.task_forces.contains(tf) {
                return Err(EditError::IntegrityViolation(format!(
                    "team type '{}' points at missing {}",
                    team_type.name,
                    EntityRef::TaskForce(tf)
                )));
            }
        }
    }
    Ok(())
}

/// Split a Hard AI trigger into Hard, Medium and Easy versions
///
/// The source keeps its id and becomes Hard-only. Each easier tier gets a
/// new AI trigger enabled for that tier alone. Not undoable.
pub fn clone_for_easier_difficulties(doc: &mut MapDocument, ai: EntityId) -> Result<CloneReport> {
    let source = doc
        .ai_triggers
        .get(ai)
        .cloned()
        .ok_or(EditError::EntityNotFound(EntityRef::AiTrigger(ai)))?;
    if !source.enabled.is_enabled(Difficulty::Hard) {
        return Err(EditError::InvalidInput(format!(
            "AI trigger '{}' is not enabled on Hard",
            source.name
        )));
    }
    check_sources(doc, &source)?;

    let mut cloner = DifficultyCloner {
        doc: &mut *doc,
        report: CloneReport {
            source: Some(ai),
            ..CloneReport::default()
        },
    };
    for &tier in Difficulty::Hard.easier() {
        cloner.ai_trigger_for(&source, tier)?;
    }
    let report = cloner.report;

    if let Some(original) = doc.ai_triggers.get_mut(ai) {
        original.enabled = Difficulties::only(Difficulty::Hard);
    }
    doc.logger
        .categorized(VerbosityLevel::Minimal, "clone", &format!("'{}': {report}", source.name));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Entity, TaskForce, TeamType};

    #[test]
    fn test_derive_name_replaces_last_token() {
        assert_eq!(derive_name("Hard Rush Hard", "Hard", "Easy"), "Hard Rush Easy");
        assert_eq!(derive_name("TT1", "Hard", "Medium"), "TT1 Medium");
        assert_eq!(derive_name("Attack", "", "Easy"), "Attack Easy");
    }

    fn doc_with_chain() -> (MapDocument, EntityId, EntityId, EntityId) {
        let mut doc = MapDocument::new();
        let tf = doc.allocator.allocate();
        let team = doc.allocator.allocate();
        let ai = doc.allocator.allocate();
        doc.insert_entity(Entity::TaskForce(
            TaskForce::new(tf, "TF1").with_entry("E1", 5).with_entry("HTNK", 2),
        ))
        .unwrap();
        doc.insert_entity(Entity::TeamType(TeamType::new(team, "TT1").with_task_force(tf)))
            .unwrap();
        doc.insert_entity(Entity::AiTrigger(
            AiTriggerType::new(ai, "AI1", "<all>").with_primary(team),
        ))
        .unwrap();
        (doc, tf, team, ai)
    }

    #[test]
    fn test_clone_creates_one_chain_per_tier() {
        let (mut doc, tf, team, ai) = doc_with_chain();
        let report = clone_for_easier_difficulties(&mut doc, ai).unwrap();

        assert_eq!(report.created_ai_triggers.len(), 2);
        assert_eq!(report.created_team_types.len(), 2);
        assert_eq!(report.created_task_forces.len(), 2);
        assert_eq!(
            doc.ai_triggers.get(ai).unwrap().enabled,
            Difficulties::only(Difficulty::Hard)
        );
        assert_eq!(doc.ai_triggers.get(ai).unwrap().primary_team, Some(team));

        let medium = doc.ai_triggers.find_by_name("AI1 Medium").unwrap();
        assert_eq!(medium.enabled, Difficulties::only(Difficulty::Medium));
        let medium_team = doc.team_types.get(medium.primary_team.unwrap()).unwrap();
        assert_eq!(medium_team.name, "TT1 Medium");
        let medium_tf = doc.task_forces.get(medium_team.task_force.unwrap()).unwrap();
        assert_eq!(medium_tf.name, "TF1 Medium");
        assert_eq!(medium_tf.entries, doc.task_forces.get(tf).unwrap().entries);

        doc.check_integrity().unwrap();
    }

    #[test]
    fn test_second_run_reuses_team_clones() {
        let (mut doc, _, _, ai) = doc_with_chain();
        clone_for_easier_difficulties(&mut doc, ai).unwrap();
        let second = clone_for_easier_difficulties(&mut doc, ai).unwrap();

        assert!(second.created_team_types.is_empty());
        assert!(second.created_task_forces.is_empty());
        assert_eq!(second.reused_team_types.len(), 2);
        assert_eq!(doc.team_types.len(), 3);
        assert_eq!(doc.task_forces.len(), 3);
    }

    #[test]
    fn test_reuses_unrelated_entity_with_derived_name() {
        let (mut doc, _, _, ai) = doc_with_chain();
        let stranger = doc.allocator.allocate();
        doc.insert_entity(Entity::TeamType(TeamType::new(stranger, "TT1 Easy")))
            .unwrap();

        let report = clone_for_easier_difficulties(&mut doc, ai).unwrap();
        assert_eq!(report.reused_team_types, vec![stranger]);
        let easy = doc.ai_triggers.find_by_name("AI1 Easy").unwrap();
        assert_eq!(easy.primary_team, Some(stranger));
    }

    #[test]
    fn test_source_must_be_hard_enabled() {
        let (mut doc, _, _, ai) = doc_with_chain();
        doc.ai_triggers.get_mut(ai).unwrap().enabled = Difficulties::only(Difficulty::Easy);
        let before = doc.clone();
        assert!(matches!(
            clone_for_easier_difficulties(&mut doc, ai),
            Err(EditError::InvalidInput(_))
        ));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_dangling_team_leaves_document_untouched() {
        let (mut doc, _, team, ai) = doc_with_chain();
        doc.team_types.remove(team);
        let before = doc.clone();
        assert!(matches!(
            clone_for_easier_difficulties(&mut doc, ai),
            Err(EditError::IntegrityViolation(_))
        ));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_clone_logs_under_clone_category() {
        let (mut doc, _, _, ai) = doc_with_chain();
        clone_for_easier_difficulties(&mut doc, ai).unwrap();
        let logs = doc.logger.logs();
        assert!(logs
            .iter()
            .all(|e| e.category.as_deref() == Some("clone")));
        assert!(logs.iter().any(|e| e.message == "Created team type 'TT1 Medium'"));
    }
}
