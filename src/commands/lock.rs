//! `sdgflow lock list` and `sdgflow lock clear`.

use crate::cli::LockClearArgs;
use crate::config::Config;
use crate::context::FlowContext;
use crate::error::{FlowError, Result};
use crate::events::{self, Event, EventAction};
use crate::locks;
use serde_json::json;
use std::path::Path;

/// Lock commands only need the stale threshold, so a broken config falls
/// back to the default rather than blocking lock recovery.
fn stale_minutes(ctx: &FlowContext) -> u32 {
    Config::load_or_default(ctx.config_path())
        .unwrap_or_default()
        .lock_stale_minutes
}

pub fn cmd_lock_list(dir: Option<&Path>) -> Result<()> {
    let ctx = FlowContext::resolve(dir)?;
    let locks = locks::list_locks(&ctx, stale_minutes(&ctx))?;

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();
    for lock in &locks {
        println!("  {}:", lock.session);
        println!("    Owner:      {}", lock.metadata.owner);
        if let Some(pid) = lock.metadata.pid {
            println!("    PID:        {}", pid);
        }
        println!("    Action:     {}", lock.metadata.action);
        println!(
            "    Age:        {}{}",
            lock.metadata.age_string(),
            if lock.is_stale { " (STALE)" } else { "" }
        );
        println!("    Path:       {}", lock.path.display());
    }
    Ok(())
}

pub fn cmd_lock_clear(dir: Option<&Path>, args: LockClearArgs) -> Result<()> {
    if !args.force {
        return Err(FlowError::UserError(format!(
            "refusing to clear the lock for session '{}' without --force\n\
             Make sure no other sdgflow process is using it first (see: sdgflow lock list).",
            args.session
        )));
    }

    let ctx = FlowContext::resolve(dir)?;
    let metadata = locks::clear_lock(&ctx, &args.session)?;

    let details = match &metadata {
        Some(meta) => json!({
            "owner": meta.owner,
            "action": meta.action,
            "age_minutes": meta.age().num_minutes(),
            "stale": meta.is_stale(stale_minutes(&ctx)),
        }),
        None => json!({ "unreadable": true }),
    };
    events::record(
        &ctx,
        &Event::new(EventAction::LockClear)
            .with_session(&args.session)
            .with_details(details),
    );

    match metadata {
        Some(meta) => println!(
            "Cleared lock for session '{}' (held by {} for {}, action: {}).",
            args.session,
            meta.owner,
            meta.age_string(),
            meta.action
        ),
        None => println!("Cleared unreadable lock for session '{}'.", args.session),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::read_events;
    use tempfile::TempDir;

    fn clear(dir: &Path, session: &str, force: bool) -> Result<()> {
        cmd_lock_clear(
            Some(dir),
            LockClearArgs {
                session: session.to_string(),
                force,
            },
        )
    }

    #[test]
    fn test_clear_requires_force() {
        let temp = TempDir::new().unwrap();
        let ctx = FlowContext::resolve_from(temp.path()).unwrap();
        let guard = locks::acquire_session_lock(&ctx, "alpha", "run", 120).unwrap();
        std::mem::forget(guard);

        let err = clear(temp.path(), "alpha", false).unwrap_err();
        assert!(err.to_string().contains("without --force"));
        assert!(ctx.session_lock_path("alpha").exists());

        clear(temp.path(), "alpha", true).unwrap();
        assert!(!ctx.session_lock_path("alpha").exists());

        let events = read_events(&ctx, Some("alpha")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, EventAction::LockClear);
        assert_eq!(events[0].details["action"], "run");
    }

    #[test]
    fn test_clear_missing_lock() {
        let temp = TempDir::new().unwrap();
        let err = clear(temp.path(), "alpha", true).unwrap_err();
        assert!(err.to_string().contains("no lock for session 'alpha'"));
    }

    #[test]
    fn test_list_with_broken_config() {
        let temp = TempDir::new().unwrap();
        let ctx = FlowContext::resolve_from(temp.path()).unwrap();
        std::fs::create_dir_all(&ctx.state_dir).unwrap();
        std::fs::write(ctx.config_path(), "lock_stale_minutes: [").unwrap();

        assert_eq!(stale_minutes(&ctx), Config::default().lock_stale_minutes);
        cmd_lock_list(Some(temp.path())).unwrap();
    }
}
