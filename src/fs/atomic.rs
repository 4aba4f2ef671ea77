//! Atomic file writes.
//!
//! Every write follows the same three steps:
//! 1. Write the content to a temporary sibling file
//! 2. fsync the temporary file
//! 3. Rename it over the target
//!
//! `rename` replaces the destination atomically when both paths live on the
//! same filesystem, which is why the temporary file is always created next to
//! the target. A crash leaves either the old content or the new content, plus
//! possibly a stray `.{filename}.{pid}.tmp` file.

use crate::error::{FlowError, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories as needed.
///
/// # Returns
///
/// * `Ok(())` - The target now holds exactly `content`
/// * `Err(FlowError::Persistence)` - Any step failed; the target is untouched
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            FlowError::Persistence(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;
    replace(&temp_path, path)
}

/// Serialize a value as pretty JSON and write it atomically.
pub fn atomic_write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let mut json = serde_json::to_string_pretty(value).map_err(|e| {
        FlowError::Persistence(format!(
            "failed to serialize '{}' to JSON: {}",
            path.display(),
            e
        ))
    })?;
    json.push('\n');
    atomic_write(path, json.as_bytes())
}

/// Temporary sibling path: `.{filename}.{pid}.tmp`.
///
/// The pid suffix keeps two processes writing the same target from
/// clobbering each other's temporary file.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            FlowError::Persistence(format!("invalid file path '{}'", target.display()))
        })?;

    let temp_name = format!(".{}.{}.tmp", filename, std::process::id());
    Ok(match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    })
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        FlowError::Persistence(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let written = file.write_all(content).and_then(|_| file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(path);
        return Err(FlowError::Persistence(format!(
            "failed to write temporary file '{}': {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

fn replace(source: &Path, target: &Path) -> Result<()> {
    if let Err(e) = fs::rename(source, target) {
        let _ = fs::remove_file(source);
        return Err(FlowError::Persistence(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        )));
    }

    sync_parent_dir(target);
    Ok(())
}

/// Persist the directory entry as well; best effort.
#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}
