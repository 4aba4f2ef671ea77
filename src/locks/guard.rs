use super::metadata::LockMetadata;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Holds a lock file for as long as it lives.
///
/// On drop the file is removed only if it still carries the metadata this
/// guard wrote. A lock cleared with `lock clear --force` and re-taken by
/// another process is left alone.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    metadata: LockMetadata,
}

impl LockGuard {
    pub(super) fn new(path: PathBuf, metadata: LockMetadata) -> Self {
        Self { path, metadata }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match LockMetadata::from_file(&self.path) {
            Ok(current) if current == self.metadata => match fs::remove_file(&self.path) {
                Ok(()) => debug!(lock = %self.path.display(), "lock released"),
                Err(e) => warn!(lock = %self.path.display(), error = %e, "failed to release lock"),
            },
            Ok(current) => warn!(
                lock = %self.path.display(),
                owner = %current.owner,
                action = %current.action,
                "lock was taken over while held; leaving it in place"
            ),
            Err(e) => debug!(lock = %self.path.display(), error = %e, "lock already gone"),
        }
    }
}
