use super::*;
use crate::context::FlowContext;
use crate::error::FlowError;
use chrono::{Duration, Utc};
use tempfile::TempDir;

fn create_test_context() -> (TempDir, FlowContext) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = FlowContext::resolve_from(temp_dir.path()).unwrap();
    (temp_dir, ctx)
}

fn write_lock(ctx: &FlowContext, session: &str, meta: &LockMetadata) {
    std::fs::create_dir_all(&ctx.locks_dir).unwrap();
    std::fs::write(ctx.session_lock_path(session), meta.to_json().unwrap()).unwrap();
}

#[test]
fn test_lock_metadata_creation() {
    let meta = LockMetadata::new("run");

    assert!(meta.owner.contains('@'));
    assert_eq!(meta.pid, Some(std::process::id()));
    assert_eq!(meta.action, "run");
    assert!(meta.age().num_minutes() < 1);
    assert!(!meta.is_stale(1));
}

#[test]
fn test_age_string() {
    let mut meta = LockMetadata::new("send");
    meta.created_at = Utc::now() - Duration::minutes(5);
    assert_eq!(meta.age_string(), "5m");

    meta.created_at = Utc::now() - Duration::minutes(125);
    assert_eq!(meta.age_string(), "2h 5m");

    meta.created_at = Utc::now() - Duration::hours(26);
    assert_eq!(meta.age_string(), "1d 2h");
}

#[test]
fn test_acquire_and_release_on_drop() {
    let (_temp, ctx) = create_test_context();
    let lock_path = ctx.session_lock_path("alpha");

    {
        let _guard = acquire_session_lock(&ctx, "alpha", "run", 120).unwrap();
        assert!(lock_path.exists());

        let meta = LockMetadata::from_file(&lock_path).unwrap();
        assert_eq!(meta.action, "run");
    }

    assert!(!lock_path.exists());
}

#[test]
fn test_second_acquire_fails() {
    let (_temp, ctx) = create_test_context();
    let _guard = acquire_session_lock(&ctx, "alpha", "run", 120).unwrap();

    let err = acquire_session_lock(&ctx, "alpha", "send", 120).unwrap_err();
    assert!(matches!(err, FlowError::LockError(_)));
    assert_eq!(err.exit_code(), crate::exit_codes::LOCK_FAILURE);
    let msg = err.to_string();
    assert!(msg.contains("session 'alpha' is in use"));
    assert!(msg.contains("(run,"));
    assert!(msg.contains("sdgflow lock clear alpha --force"));
}

#[test]
fn test_sessions_lock_independently() {
    let (_temp, ctx) = create_test_context();
    let _a = acquire_session_lock(&ctx, "alpha", "run", 120).unwrap();
    let _b = acquire_session_lock(&ctx, "beta", "run", 120).unwrap();

    let locks = list_locks(&ctx, 120).unwrap();
    let names: Vec<&str> = locks.iter().map(|l| l.session.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert!(locks.iter().all(|l| !l.is_stale));
}

#[test]
fn test_stale_lock_is_reported_not_taken() {
    let (_temp, ctx) = create_test_context();
    let mut old = LockMetadata::new("run");
    old.created_at = Utc::now() - Duration::minutes(30);
    old.owner = "someone@elsewhere".to_string();
    write_lock(&ctx, "alpha", &old);

    let err = acquire_session_lock(&ctx, "alpha", "send", 60).unwrap_err();
    assert!(err.to_string().contains("someone@elsewhere"));
    assert!(!err.to_string().contains("STALE"));

    // An idle `run` still holds its session; age alone never frees it.
    let err = acquire_session_lock(&ctx, "alpha", "send", 10).unwrap_err();
    assert!(matches!(err, FlowError::LockError(_)));
    assert!(err.to_string().contains("STALE"));
    assert_eq!(LockMetadata::from_file(&ctx.session_lock_path("alpha")).unwrap(), old);
}

#[test]
fn test_list_locks_marks_stale_and_skips_junk() {
    let (_temp, ctx) = create_test_context();
    let mut old = LockMetadata::new("run");
    old.created_at = Utc::now() - Duration::hours(3);
    write_lock(&ctx, "old", &old);
    write_lock(&ctx, "fresh", &LockMetadata::new("send"));
    std::fs::write(ctx.locks_dir.join("broken.lock"), "not json").unwrap();
    std::fs::write(ctx.locks_dir.join("notes.txt"), "ignore me").unwrap();

    let locks = list_locks(&ctx, 120).unwrap();
    assert_eq!(locks.len(), 2);
    assert_eq!(locks[0].session, "fresh");
    assert!(!locks[0].is_stale);
    assert_eq!(locks[1].session, "old");
    assert!(locks[1].is_stale);
    assert!(locks[1].to_string().contains("STALE"));
}

#[test]
fn test_list_locks_without_directory() {
    let (_temp, ctx) = create_test_context();
    assert!(list_locks(&ctx, 120).unwrap().is_empty());
}

#[test]
fn test_clear_lock() {
    let (_temp, ctx) = create_test_context();
    let guard = acquire_session_lock(&ctx, "alpha", "run", 120).unwrap();
    let path = ctx.session_lock_path("alpha");
    // Simulate a crashed holder.
    std::mem::forget(guard);

    let meta = clear_lock(&ctx, "alpha").unwrap().unwrap();
    assert_eq!(meta.action, "run");
    assert!(!path.exists());

    let err = clear_lock(&ctx, "alpha").unwrap_err();
    assert!(err.to_string().contains("no lock for session 'alpha'"));
}

#[test]
fn test_clear_unreadable_lock() {
    let (_temp, ctx) = create_test_context();
    std::fs::create_dir_all(&ctx.locks_dir).unwrap();
    std::fs::write(ctx.session_lock_path("alpha"), "garbage").unwrap();

    assert_eq!(clear_lock(&ctx, "alpha").unwrap(), None);
    assert!(!ctx.session_lock_path("alpha").exists());
}

#[test]
fn test_invalid_session_ids_are_rejected() {
    let (_temp, ctx) = create_test_context();
    assert!(acquire_session_lock(&ctx, "../escape", "run", 120).is_err());
    assert!(clear_lock(&ctx, "a/b").is_err());
}

#[test]
fn test_guard_leaves_a_lock_it_no_longer_owns() {
    let (_temp, ctx) = create_test_context();
    let first = acquire_session_lock(&ctx, "alpha", "run", 120).unwrap();

    // Cleared by hand, then taken by another process.
    clear_lock(&ctx, "alpha").unwrap();
    let mut other = LockMetadata::new("send");
    other.owner = "someone@elsewhere".to_string();
    write_lock(&ctx, "alpha", &other);

    drop(first);
    let path = ctx.session_lock_path("alpha");
    assert!(path.exists());
    assert_eq!(LockMetadata::from_file(&path).unwrap(), other);
}
