//! Named artifacts produced by workflow states.

use crate::error::{FlowError, Result};
use crate::workflow::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where an artifact's document lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactContent {
    /// The document itself, stored in the session file.
    Inline(String),
    /// A reference to a document on disk, relative to the workspace root
    /// unless absolute.
    File(PathBuf),
}

/// An artifact and the state that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub owner: StateId,
    pub content: ArtifactContent,
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(owner: StateId, content: ArtifactContent) -> Self {
        Self {
            owner,
            content,
            updated_at: Utc::now(),
        }
    }

    /// Read the document. File references are resolved against `base_dir`.
    pub fn read(&self, name: &str, base_dir: &Path) -> Result<String> {
        match &self.content {
            ArtifactContent::Inline(text) => Ok(text.clone()),
            ArtifactContent::File(path) => {
                let full = base_dir.join(path);
                fs::read_to_string(&full).map_err(|e| {
                    FlowError::schema(
                        name,
                        "(artifact)",
                        format!("cannot be read from '{}': {}", full.display(), e),
                    )
                })
            }
        }
    }

    /// Short description for status output.
    pub fn summary(&self) -> String {
        match &self.content {
            ArtifactContent::Inline(text) => format!("inline, {} bytes", text.len()),
            ArtifactContent::File(path) => format!("file {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_inline_and_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("seed.jsonl"), "{\"a\":\"b\"}\n").unwrap();

        let inline = Artifact::new(StateId::from("s"), ArtifactContent::Inline("x".to_string()));
        assert_eq!(inline.read("seed_data", temp_dir.path()).unwrap(), "x");
        assert_eq!(inline.summary(), "inline, 1 bytes");

        let file = Artifact::new(
            StateId::from("s"),
            ArtifactContent::File(PathBuf::from("seed.jsonl")),
        );
        assert_eq!(file.read("seed_data", temp_dir.path()).unwrap(), "{\"a\":\"b\"}\n");
        assert_eq!(file.summary(), "file seed.jsonl");
    }

    #[test]
    fn test_missing_file_is_schema_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = Artifact::new(
            StateId::from("s"),
            ArtifactContent::File(PathBuf::from("gone.jsonl")),
        );
        let err = file.read("seed_data", temp_dir.path()).unwrap_err();
        assert!(matches!(err, FlowError::Schema { .. }));
        assert!(err.to_string().contains("cannot be read"));
    }

    #[test]
    fn test_content_serialization() {
        let json = serde_json::to_value(ArtifactContent::File(PathBuf::from("a.json"))).unwrap();
        assert_eq!(json, serde_json::json!({"file": "a.json"}));
    }
}
