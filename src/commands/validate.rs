//! `sdgflow validate STATE FILE`: run a state's structural checks against
//! an artifact file without touching any session.

use super::open_workspace;
use crate::cli::ValidateArgs;
use crate::error::{FlowError, Result};
use crate::workflow::{StateDef, StateId};
use std::fs;
use std::path::Path;

pub fn cmd_validate(dir: Option<&Path>, args: ValidateArgs) -> Result<()> {
    let workspace = open_workspace(dir)?;
    let state = workspace
        .controller
        .workflow()
        .state(&StateId::from(args.state.as_str()))?;

    let artifact = checked_artifact(state)?;
    let text = fs::read_to_string(&args.file).map_err(|e| {
        FlowError::UserError(format!("failed to read '{}': {}", args.file.display(), e))
    })?;

    state.rule.check_document(artifact, &text)?;
    println!(
        "OK: '{}' passes the '{}' checks for {} ({}).",
        args.file.display(),
        state.id,
        artifact,
        state.rule.describe()
    );
    Ok(())
}

/// The artifact a file given for `state` stands for.
fn checked_artifact(state: &StateDef) -> Result<&str> {
    let checked = state.rule.structural_artifacts();
    state
        .produces
        .as_deref()
        .into_iter()
        .chain(state.refines.iter().map(String::as_str))
        .chain(checked.iter().copied())
        .find(|a| checked.contains(a))
        .ok_or_else(|| {
            FlowError::UserError(format!(
                "state '{}' has no schema or range checks to run (rule: {})",
                state.id,
                state.rule.describe()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use crate::test_support::{SEED_JSON, create_test_workspace};
    use std::path::PathBuf;

    fn validate(dir: &Path, state: &str, file: PathBuf) -> Result<()> {
        cmd_validate(
            Some(dir),
            ValidateArgs {
                state: state.to_string(),
                file,
            },
        )
    }

    #[test]
    fn test_valid_seed_file() {
        let temp = create_test_workspace("skills");
        let file = temp.path().join("seed.jsonl");
        fs::write(&file, format!("{}\n{}\n", SEED_JSON, SEED_JSON)).unwrap();

        validate(temp.path(), "seed_data_creation", file).unwrap();
    }

    #[test]
    fn test_invalid_seed_file() {
        let temp = create_test_workspace("skills");
        let file = temp.path().join("seed.jsonl");
        fs::write(&file, "{\"task_description\":\"x\"}\n").unwrap();

        let err = validate(temp.path(), "seed_data_creation", file).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_FAILURE);
    }

    #[test]
    fn test_range_file() {
        let temp = create_test_workspace("skills");
        let file = temp.path().join("params.json");
        fs::write(&file, r#"{"count": 0}"#).unwrap();

        let err = validate(temp.path(), "data_generation", file).unwrap_err();
        assert!(matches!(err, FlowError::Range { .. }));
    }

    #[test]
    fn test_refining_state_checks_refined_artifact() {
        let temp = create_test_workspace("skills");
        let file = temp.path().join("seed.jsonl");
        fs::write(&file, SEED_JSON).unwrap();

        // seed_data_iteration only asks for approval, so there is nothing to run.
        let err = validate(temp.path(), "seed_data_iteration", file).unwrap_err();
        assert!(err.to_string().contains("no schema or range checks"));
    }

    #[test]
    fn test_unknown_state() {
        let temp = create_test_workspace("skills");
        let err = validate(temp.path(), "nowhere", temp.path().join("x")).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }
}
