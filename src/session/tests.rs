//! Tests for session state and storage.

use super::*;
use crate::config::Config;
use crate::context::FlowContext;
use std::fs;
use tempfile::TempDir;

fn store() -> (TempDir, FlowContext, SessionStore) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = FlowContext::resolve_from(temp_dir.path()).unwrap();
    let store = SessionStore::new(&ctx);
    (temp_dir, ctx, store)
}

fn populated() -> SessionState {
    let mut state = SessionState::new("default", StateId::from("seed_data_creation"));
    state.artifacts.insert(
        "seed_data".to_string(),
        Artifact::new(
            StateId::from("seed_data_creation"),
            ArtifactContent::Inline(
                r#"{"task_description":"x","seed_question":"y","seed_response":"z"}"#.to_string(),
            ),
        ),
    );
    state.enter(StateId::from("seed_data_iteration"), TransitionKind::Completed);
    state.set_iteration_count(2);
    state
}

#[test]
fn test_new_session_starts_at_initial() {
    let state = SessionState::new("s1", StateId::from("a"));
    assert_eq!(state.version, SESSION_VERSION);
    assert_eq!(state.current_state.as_str(), "a");
    assert_eq!(state.iteration_count(), 0);
    assert!(state.history.is_empty());
    assert!(state.artifacts.is_empty());
    assert!(!state.ended);
}

#[test]
fn test_enter_resets_counter_and_records_history() {
    let mut state = SessionState::new("s1", StateId::from("a"));
    state.set_iteration_count(2);
    state.enter(StateId::from("b"), TransitionKind::Forced);

    assert_eq!(state.current_state.as_str(), "b");
    assert_eq!(state.iteration_count(), 0);
    assert_eq!(state.history.len(), 1);
    let entry = &state.history[0];
    assert_eq!(entry.state.as_str(), "a");
    assert_eq!(entry.to.as_ref().map(StateId::as_str), Some("b"));
    assert_eq!(entry.outcome, TransitionKind::Forced);
    assert_eq!(entry.iterations, 2);

    // Re-entering a state starts its counter over
    state.set_iteration_count(1);
    state.enter(StateId::from("a"), TransitionKind::Routed);
    state.enter(StateId::from("b"), TransitionKind::Completed);
    assert_eq!(state.iteration_count(), 0);
}

#[test]
fn test_restart_clears_artifacts_and_counters() {
    let mut state = populated();
    state.ended = true;
    state.restart(StateId::from("seed_data_creation"));

    assert_eq!(state.current_state.as_str(), "seed_data_creation");
    assert!(state.artifacts.is_empty());
    assert_eq!(state.iteration_counts.len(), 1);
    assert_eq!(state.iteration_count(), 0);
    assert!(!state.ended);
    let last = state.history.last().unwrap();
    assert_eq!(last.outcome, TransitionKind::Restarted);
    assert_eq!(last.state.as_str(), "seed_data_iteration");
}

#[test]
fn test_close_marks_ended() {
    let mut state = populated();
    state.close();
    assert!(state.ended);
    assert_eq!(state.current_state.as_str(), "seed_data_iteration");
    let last = state.history.last().unwrap();
    assert_eq!(last.outcome, TransitionKind::Closed);
    assert!(last.to.is_none());
}

#[test]
fn test_save_load_round_trip() {
    let (_temp_dir, _ctx, store) = store();
    let state = populated();

    store.save(&state).unwrap();
    let loaded = store.load("default").unwrap().unwrap();

    assert_eq!(loaded, state);
    assert_eq!(loaded.current_state, state.current_state);
    assert_eq!(loaded.iteration_count(), 2);
    assert_eq!(loaded.artifacts, state.artifacts);

    // load -> store -> load is stable
    store.save(&loaded).unwrap();
    assert_eq!(store.load("default").unwrap().unwrap(), state);
}

#[test]
fn test_load_missing_is_none() {
    let (_temp_dir, _ctx, store) = store();
    assert!(store.load("nobody").unwrap().is_none());
}

#[test]
fn test_load_corrupt_is_persistence_error() {
    let (_temp_dir, ctx, store) = store();
    fs::create_dir_all(&ctx.sessions_dir).unwrap();
    fs::write(ctx.session_path("broken"), "{ not json").unwrap();

    let err = store.load("broken").unwrap_err();
    assert!(matches!(err, FlowError::Persistence(_)));
    assert!(err.to_string().contains("--fresh"));
}

#[test]
fn test_load_rejects_foreign_or_newer_documents() {
    let (_temp_dir, ctx, store) = store();
    let mut state = populated();
    state.session_id = "other".to_string();
    fs::create_dir_all(&ctx.sessions_dir).unwrap();
    fs::write(
        ctx.session_path("default"),
        serde_json::to_string(&state).unwrap(),
    )
    .unwrap();
    let err = store.load("default").unwrap_err();
    assert!(err.to_string().contains("belongs to session 'other'"));

    let mut state = populated();
    state.version = SESSION_VERSION + 1;
    store.save(&state).unwrap();
    let err = store.load("default").unwrap_err();
    assert!(err.to_string().contains("newer than supported"));
}

#[test]
fn test_invalid_session_ids_are_rejected() {
    let (_temp_dir, _ctx, store) = store();
    let too_long = "x".repeat(65);
    let longest = "x".repeat(64);
    for id in ["", "../escape", "a/b", "-lead", "has space", too_long.as_str()] {
        assert!(validate_session_id(id).is_err(), "id {:?}", id);
        assert!(store.load(id).is_err());
    }
    for id in ["default", "user-42", "A_b-9", longest.as_str()] {
        assert!(validate_session_id(id).is_ok(), "id {:?}", id);
    }
}

#[test]
fn test_remove_and_list() {
    let (_temp_dir, ctx, store) = store();
    assert!(store.list().unwrap().is_empty());

    store.save(&SessionState::new("b", StateId::from("s"))).unwrap();
    store.save(&SessionState::new("a", StateId::from("s"))).unwrap();
    fs::write(ctx.sessions_dir.join("notes.txt"), "ignored").unwrap();

    assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
    assert!(store.remove("a").unwrap());
    assert!(!store.remove("a").unwrap());
    assert_eq!(store.list().unwrap(), vec!["b".to_string()]);
}

#[test]
fn test_check_against_workflow() {
    let workflow = WorkflowTable::from_config(&Config::default()).unwrap();
    let state = SessionState::new("default", StateId::from("seed_data_creation"));
    assert!(state.check_against(&workflow).is_ok());

    let state = SessionState::new("default", StateId::from("greeting_intent"));
    let err = state.check_against(&workflow).unwrap_err();
    assert!(matches!(err, FlowError::Persistence(_)));
    assert!(err.to_string().contains("'greeting_intent'"));
}
