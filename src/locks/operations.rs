use super::guard::LockGuard;
use super::metadata::LockMetadata;
use crate::context::FlowContext;
use crate::error::{FlowError, Result};
use crate::session::validate_session_id;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A lock file found on disk.
#[derive(Debug, Clone)]
pub struct LockInfo {
    pub path: PathBuf,
    /// The session the lock guards.
    pub session: String,
    pub metadata: LockMetadata,
    pub is_stale: bool,
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, action: {}{})",
            self.session,
            self.metadata.owner,
            self.metadata.age_string(),
            self.metadata.action,
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}

/// Create `lock_path` exclusively and write `metadata` into it.
fn create_lock(lock_path: &Path, metadata: &LockMetadata) -> std::io::Result<LockGuard> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)?;

    let written = metadata
        .to_json()
        .map_err(|e| std::io::Error::other(e.to_string()))
        .and_then(|json| file.write_all(json.as_bytes()))
        .and_then(|()| file.sync_all());

    if let Err(e) = written {
        let _ = fs::remove_file(lock_path);
        return Err(e);
    }
    Ok(LockGuard::new(lock_path.to_path_buf(), metadata.clone()))
}

/// Take the lock for `session_id`.
///
/// A lock held by someone else fails with `LockError`. A lock older than
/// `stale_minutes` is only reported as stale: its holder may be an idle but
/// live `run`, so clearing it is left to `sdgflow lock clear --force`.
pub fn acquire_session_lock(
    ctx: &FlowContext,
    session_id: &str,
    action: &str,
    stale_minutes: u32,
) -> Result<LockGuard> {
    validate_session_id(session_id)?;
    fs::create_dir_all(&ctx.locks_dir).map_err(|e| {
        FlowError::LockError(format!(
            "failed to create locks directory '{}': {}",
            ctx.locks_dir.display(),
            e
        ))
    })?;

    let lock_path = ctx.session_lock_path(session_id);
    let metadata = LockMetadata::new(action);

    match create_lock(&lock_path, &metadata) {
        Ok(guard) => {
            debug!(session = session_id, action, "lock acquired");
            Ok(guard)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let holder = match LockMetadata::from_file(&lock_path) {
                Ok(meta) => {
                    let stale = meta.is_stale(stale_minutes);
                    if stale {
                        warn!(
                            session = session_id,
                            owner = %meta.owner,
                            age = %meta.age_string(),
                            "session lock is stale"
                        );
                    }
                    format!(
                        " by {} ({}, {} ago{})",
                        meta.owner,
                        meta.action,
                        meta.age_string(),
                        if stale { ", STALE" } else { "" }
                    )
                }
                Err(_) => String::new(),
            };
            Err(FlowError::LockError(format!(
                "session '{}' is in use{}\nLock: {}\nIf that process is gone, run: sdgflow lock clear {} --force",
                session_id,
                holder,
                lock_path.display(),
                session_id
            )))
        }
        Err(e) => Err(FlowError::LockError(format!(
            "failed to acquire lock '{}': {}",
            lock_path.display(),
            e
        ))),
    }
}

/// All lock files, sorted by session. Unreadable lock files are skipped.
pub fn list_locks(ctx: &FlowContext, stale_minutes: u32) -> Result<Vec<LockInfo>> {
    if !ctx.locks_dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&ctx.locks_dir).map_err(|e| {
        FlowError::LockError(format!(
            "failed to read locks directory '{}': {}",
            ctx.locks_dir.display(),
            e
        ))
    })?;

    let mut locks = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| FlowError::LockError(format!("failed to read locks directory: {}", e)))?
            .path();

        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }
        let Some(session) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };
        let metadata = match LockMetadata::from_file(&path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(lock = %path.display(), error = %e, "skipping unreadable lock file");
                continue;
            }
        };

        let is_stale = metadata.is_stale(stale_minutes);
        locks.push(LockInfo {
            path,
            session,
            metadata,
            is_stale,
        });
    }

    locks.sort_by(|a, b| a.session.cmp(&b.session));
    Ok(locks)
}

/// Remove the lock for `session_id`, returning what it held. A lock file
/// whose metadata cannot be read is removed all the same.
pub fn clear_lock(ctx: &FlowContext, session_id: &str) -> Result<Option<LockMetadata>> {
    validate_session_id(session_id)?;
    let lock_path = ctx.session_lock_path(session_id);

    if !lock_path.exists() {
        return Err(FlowError::UserError(format!(
            "no lock for session '{}' at: {}",
            session_id,
            lock_path.display()
        )));
    }

    let metadata = LockMetadata::from_file(&lock_path).ok();

    fs::remove_file(&lock_path).map_err(|e| {
        FlowError::LockError(format!(
            "failed to clear lock '{}': {}",
            lock_path.display(),
            e
        ))
    })?;

    Ok(metadata)
}
