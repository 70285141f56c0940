//! Cascading difficulty clone through the public API

use mapedit::{
    config::{DifficultyTokens, EditorConfig},
    core::{AiTriggerType, Difficulties, Difficulty, Entity, TaskForce, TeamType},
    edit::{clone_for_easier_difficulties, AddEntity},
    MapDocument, MutationEngine,
};
use similar_asserts::assert_eq;

/// TF1 (two entries) <- TT1 <- AI1 (Hard), built through the history
fn build_chain(doc: &mut MapDocument, engine: &mut MutationEngine, names: [&str; 3]) {
    let tf = doc.allocator.allocate();
    let team = doc.allocator.allocate();
    let ai = doc.allocator.allocate();
    let entities = [
        Entity::TaskForce(
            TaskForce::new(tf, names[0])
                .with_entry("E1", 6)
                .with_entry("MTNK", 2),
        ),
        Entity::TeamType(TeamType::new(team, names[1]).with_task_force(tf)),
        Entity::AiTrigger(AiTriggerType::new(ai, names[2], "Americans").with_primary(team)),
    ];
    for entity in entities {
        let m = AddEntity::new(doc, entity).unwrap();
        engine.perform(doc, Box::new(m)).unwrap();
    }
}

#[test]
fn test_hard_trigger_gets_medium_and_easy_chains() {
    let mut doc = MapDocument::new();
    let mut engine = MutationEngine::new();
    build_chain(&mut doc, &mut engine, ["TF1", "TT1", "AI1"]);
    let ai1 = doc.ai_triggers.find_by_name("AI1").unwrap().clone();
    let tf1 = doc.task_forces.find_by_name("TF1").unwrap().clone();

    clone_for_easier_difficulties(&mut doc, ai1.id).unwrap();

    // Source is unchanged except for its tier flags
    let mut expected_source = ai1.clone();
    expected_source.enabled = Difficulties::only(Difficulty::Hard);
    assert_eq!(doc.ai_triggers.get(ai1.id).unwrap(), &expected_source);

    for (tier, suffix) in [(Difficulty::Medium, "Medium"), (Difficulty::Easy, "Easy")] {
        let ai = doc
            .ai_triggers
            .find_by_name(&format!("AI1 {suffix}"))
            .unwrap();
        assert_eq!(ai.enabled, Difficulties::only(tier));
        assert_eq!(ai.owner, "Americans");
        assert_eq!(ai.secondary_team, None);

        let team = doc.team_types.get(ai.primary_team.unwrap()).unwrap();
        assert_eq!(team.name, format!("TT1 {suffix}"));
        let tf = doc.task_forces.get(team.task_force.unwrap()).unwrap();
        assert_eq!(tf.name, format!("TF1 {suffix}"));
        assert_eq!(tf.entries, tf1.entries);
        assert_ne!(tf.id, tf1.id);
    }

    assert_eq!(doc.ai_triggers.len(), 3);
    assert_eq!(doc.team_types.len(), 3);
    assert_eq!(doc.task_forces.len(), 3);
    doc.check_integrity().unwrap();

    // Not part of the history
    assert_eq!(engine.undo_count(), 3);
}

#[test]
fn test_second_run_creates_no_new_teams_or_task_forces() {
    let mut doc = MapDocument::new();
    let mut engine = MutationEngine::new();
    build_chain(&mut doc, &mut engine, ["TF1", "TT1", "AI1"]);
    let ai1 = doc.ai_triggers.find_by_name("AI1").unwrap().id;

    let first = clone_for_easier_difficulties(&mut doc, ai1).unwrap();
    let second = clone_for_easier_difficulties(&mut doc, ai1).unwrap();

    assert_eq!(first.created_team_types.len(), 2);
    assert_eq!(first.created_task_forces.len(), 2);
    assert!(second.created_team_types.is_empty());
    assert!(second.created_task_forces.is_empty());

    let mut reused = second.reused_team_types.clone();
    reused.sort();
    let mut created = first.created_team_types.clone();
    created.sort();
    assert_eq!(reused, created);

    assert_eq!(doc.team_types.len(), 3);
    assert_eq!(doc.task_forces.len(), 3);
}

#[test]
fn test_hard_token_in_names_is_substituted() {
    let mut doc = MapDocument::new();
    let mut engine = MutationEngine::new();
    build_chain(&mut doc, &mut engine, ["Rush TF Hard", "Rush TT Hard", "Rush Hard"]);
    let ai = doc.ai_triggers.find_by_name("Rush Hard").unwrap().id;

    clone_for_easier_difficulties(&mut doc, ai).unwrap();

    assert!(doc.ai_triggers.find_by_name("Rush Medium").is_some());
    assert!(doc.team_types.find_by_name("Rush TT Easy").is_some());
    assert!(doc.task_forces.find_by_name("Rush TF Medium").is_some());
}

#[test]
fn test_configured_tokens() {
    let config = EditorConfig {
        difficulty_tokens: DifficultyTokens {
            easy: "E".to_string(),
            medium: "M".to_string(),
            hard: "H".to_string(),
        },
        ..EditorConfig::default()
    };
    let mut doc = MapDocument::with_config(config);
    let mut engine = MutationEngine::new();
    build_chain(&mut doc, &mut engine, ["TF-H", "TT-H", "AI-H"]);
    let ai = doc.ai_triggers.find_by_name("AI-H").unwrap().id;

    clone_for_easier_difficulties(&mut doc, ai).unwrap();

    assert!(doc.ai_triggers.find_by_name("AI-M").is_some());
    assert!(doc.team_types.find_by_name("TT-E").is_some());
    assert!(doc.task_forces.find_by_name("TF-M").is_some());
}

#[test]
fn test_shared_team_is_cloned_once_per_tier() {
    let mut doc = MapDocument::new();
    let mut engine = MutationEngine::new();
    build_chain(&mut doc, &mut engine, ["TF1", "TT1", "AI1"]);
    let ai = doc.ai_triggers.find_by_name("AI1").unwrap().id;
    let team = doc.team_types.find_by_name("TT1").unwrap().id;
    doc.ai_triggers.get_mut(ai).unwrap().secondary_team = Some(team);

    let report = clone_for_easier_difficulties(&mut doc, ai).unwrap();
    assert_eq!(report.created_team_types.len(), 2);
    assert_eq!(report.reused_team_types.len(), 2);

    let medium = doc.ai_triggers.find_by_name("AI1 Medium").unwrap();
    assert_eq!(medium.primary_team, medium.secondary_team);
}
