//! Validation rule definitions and evaluation.

use super::approval::ApprovalSignal;
use super::schema;
use crate::error::{FlowError, Result};
use crate::session::Artifact;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Document format of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// One JSON object or an array of objects.
    #[default]
    Json,
    /// One JSON object per non-blank line.
    Jsonl,
}

/// Completion criteria of a workflow state.
///
/// Serialized with a `kind` tag:
///
/// ```yaml
/// rule:
///   kind: schema
///   artifact: seed_data
///   format: jsonl
///   required_fields: [task_description, seed_question, seed_response]
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationRule {
    /// Complete after any successful agent turn.
    #[default]
    Always,

    /// Never complete on its own; the state is left through a route or the
    /// iteration cap.
    Manual,

    /// Complete once the agent reports `completed: true`.
    Completed,

    /// Complete on an explicit approval signal. When `artifact` is set it
    /// must exist before approval counts.
    Approval {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        artifact: Option<String>,
    },

    /// The artifact must parse and carry every required field.
    Schema {
        artifact: String,
        #[serde(default)]
        format: ArtifactFormat,
        #[serde(default)]
        required_fields: Vec<String>,
    },

    /// A numeric field of the artifact must lie within `[min, max]`.
    Range {
        artifact: String,
        field: String,
        min: f64,
        max: f64,
    },

    /// Every inner rule must hold, checked in order.
    AllOf { rules: Vec<ValidationRule> },
}

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// The session's artifacts after the current turn's delta.
    pub artifacts: &'a BTreeMap<String, Artifact>,
    /// Approval signal for the current turn.
    pub approval: ApprovalSignal,
    /// Whether the agent reported completion this turn.
    pub completed: bool,
    /// Base directory for relative artifact file references.
    pub base_dir: &'a Path,
}

/// Result of evaluating a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// Completion criteria met.
    Satisfied,
    /// Not met yet, nothing is wrong.
    Pending(String),
    /// An artifact violates its schema or bounds.
    Failed(FlowError),
}

impl RuleOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, RuleOutcome::Satisfied)
    }
}

impl ValidationRule {
    /// Evaluate the rule. Pure: reads artifact files but never writes.
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> RuleOutcome {
        match self {
            ValidationRule::Always => RuleOutcome::Satisfied,
            ValidationRule::Manual => {
                RuleOutcome::Pending("waiting for a choice of where to go next".to_string())
            }
            ValidationRule::Completed => {
                if ctx.completed {
                    RuleOutcome::Satisfied
                } else {
                    RuleOutcome::Pending("the agent has not reported completion yet".to_string())
                }
            }
            ValidationRule::Approval { artifact } => {
                if let Some(name) = artifact
                    && !ctx.artifacts.contains_key(name)
                {
                    return RuleOutcome::Failed(FlowError::schema(
                        name,
                        "(artifact)",
                        "has not been produced yet",
                    ));
                }
                match ctx.approval {
                    ApprovalSignal::Approve => RuleOutcome::Satisfied,
                    ApprovalSignal::Reject => {
                        RuleOutcome::Pending("changes requested".to_string())
                    }
                    ApprovalSignal::Inconclusive => {
                        RuleOutcome::Pending("waiting for explicit approval".to_string())
                    }
                }
            }
            ValidationRule::Schema { artifact, .. } | ValidationRule::Range { artifact, .. } => {
                let text = match read_artifact(ctx, artifact) {
                    Ok(text) => text,
                    Err(e) => return RuleOutcome::Failed(e),
                };
                match self.check_document(artifact, &text) {
                    Ok(()) => RuleOutcome::Satisfied,
                    Err(e) => RuleOutcome::Failed(e),
                }
            }
            ValidationRule::AllOf { rules } => {
                for rule in rules {
                    let outcome = rule.evaluate(ctx);
                    if !outcome.is_satisfied() {
                        return outcome;
                    }
                }
                RuleOutcome::Satisfied
            }
        }
    }

    /// Run the structural parts of this rule (schema and range checks)
    /// that apply to `artifact` against a document.
    ///
    /// Signal-based rules (approval, completion) are ignored.
    pub fn check_document(&self, artifact: &str, text: &str) -> Result<()> {
        match self {
            ValidationRule::Schema {
                artifact: name,
                format,
                required_fields,
            } if name == artifact => {
                schema::validate_document(name, text, *format, required_fields).map(|_| ())
            }
            ValidationRule::Range {
                artifact: name,
                field,
                min,
                max,
            } if name == artifact => {
                let records = schema::parse_records(name, text, ArtifactFormat::Json)?;
                let value = schema::numeric_field(name, &records, field)?;
                if value < *min || value > *max {
                    return Err(FlowError::Range {
                        artifact: name.clone(),
                        field: field.clone(),
                        value,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            ValidationRule::AllOf { rules } => {
                rules.iter().try_for_each(|r| r.check_document(artifact, text))
            }
            _ => Ok(()),
        }
    }

    /// Whether this rule waits on human sign-off.
    pub fn requires_approval(&self) -> bool {
        match self {
            ValidationRule::Approval { .. } => true,
            ValidationRule::AllOf { rules } => rules.iter().any(|r| r.requires_approval()),
            _ => false,
        }
    }

    /// The document format this rule declares for `artifact`, if any.
    pub fn format_of(&self, artifact: &str) -> Option<ArtifactFormat> {
        match self {
            ValidationRule::Schema {
                artifact: name,
                format,
                ..
            } if name == artifact => Some(*format),
            ValidationRule::AllOf { rules } => rules.iter().find_map(|r| r.format_of(artifact)),
            _ => None,
        }
    }

    /// Artifacts with schema or range checks, the ones
    /// [`check_document`](Self::check_document) can run against.
    pub fn structural_artifacts(&self) -> Vec<&str> {
        match self {
            ValidationRule::Schema { artifact, .. } | ValidationRule::Range { artifact, .. } => {
                vec![artifact.as_str()]
            }
            ValidationRule::AllOf { rules } => rules
                .iter()
                .flat_map(|r| r.structural_artifacts())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Reject definitions that can never be evaluated sensibly.
    pub fn check_definition(&self, state: &str) -> Result<()> {
        let invalid = |msg: String| {
            Err(FlowError::UserError(format!(
                "invalid rule for state '{}': {}",
                state, msg
            )))
        };

        match self {
            ValidationRule::Schema { artifact, .. } if artifact.trim().is_empty() => {
                invalid("schema rule needs an artifact name".to_string())
            }
            ValidationRule::Range { artifact, field, min, max } => {
                if artifact.trim().is_empty() || field.trim().is_empty() {
                    return invalid("range rule needs an artifact and a field".to_string());
                }
                if !min.is_finite() || !max.is_finite() || min > max {
                    return invalid(format!("range bounds [{}, {}] are not valid", min, max));
                }
                Ok(())
            }
            ValidationRule::AllOf { rules } => {
                if rules.is_empty() {
                    return invalid("all_of needs at least one rule".to_string());
                }
                rules.iter().try_for_each(|r| r.check_definition(state))
            }
            _ => Ok(()),
        }
    }

    /// One-line description for status and help output.
    pub fn describe(&self) -> String {
        match self {
            ValidationRule::Always => "completes after any successful agent turn".to_string(),
            ValidationRule::Manual => "left only by choosing a destination".to_string(),
            ValidationRule::Completed => "agent reports completion".to_string(),
            ValidationRule::Approval { .. } => "explicit approval".to_string(),
            ValidationRule::Schema {
                artifact,
                format,
                required_fields,
            } => format!(
                "'{}' is valid {} with fields [{}]",
                artifact,
                match format {
                    ArtifactFormat::Json => "JSON",
                    ArtifactFormat::Jsonl => "JSONL",
                },
                required_fields.join(", ")
            ),
            ValidationRule::Range {
                artifact,
                field,
                min,
                max,
            } => format!("'{}.{}' within [{}, {}]", artifact, field, min, max),
            ValidationRule::AllOf { rules } => rules
                .iter()
                .map(|r| r.describe())
                .collect::<Vec<_>>()
                .join(" and "),
        }
    }
}

fn read_artifact(ctx: &RuleContext<'_>, name: &str) -> Result<String> {
    let artifact = ctx
        .artifacts
        .get(name)
        .ok_or_else(|| FlowError::schema(name, "(artifact)", "has not been produced yet"))?;
    artifact.read(name, ctx.base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ArtifactContent;
    use crate::workflow::StateId;

    fn seed_rule() -> ValidationRule {
        ValidationRule::Schema {
            artifact: "seed_data".to_string(),
            format: ArtifactFormat::Jsonl,
            required_fields: vec![
                "task_description".to_string(),
                "seed_question".to_string(),
                "seed_response".to_string(),
            ],
        }
    }

    fn count_rule() -> ValidationRule {
        ValidationRule::Range {
            artifact: "generation_params".to_string(),
            field: "count".to_string(),
            min: 1.0,
            max: 1000.0,
        }
    }

    fn inline(owner: &str, text: &str) -> Artifact {
        Artifact::new(StateId::from(owner), ArtifactContent::Inline(text.to_string()))
    }

    fn ctx<'a>(
        artifacts: &'a BTreeMap<String, Artifact>,
        approval: ApprovalSignal,
        completed: bool,
    ) -> RuleContext<'a> {
        RuleContext {
            artifacts,
            approval,
            completed,
            base_dir: Path::new("."),
        }
    }

    #[test]
    fn test_schema_rule_satisfied_and_failed() {
        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            "seed_data".to_string(),
            inline(
                "seed_data_creation",
                r#"{"task_description":"x","seed_question":"y","seed_response":"z"}"#,
            ),
        );
        let outcome = seed_rule().evaluate(&ctx(&artifacts, ApprovalSignal::Inconclusive, false));
        assert_eq!(outcome, RuleOutcome::Satisfied);

        artifacts.insert(
            "seed_data".to_string(),
            inline("seed_data_creation", r#"{"task_description":"x"}"#),
        );
        let outcome = seed_rule().evaluate(&ctx(&artifacts, ApprovalSignal::Approve, true));
        assert!(matches!(
            outcome,
            RuleOutcome::Failed(FlowError::Schema { ref field, .. }) if field == "seed_question"
        ));
    }

    #[test]
    fn test_schema_rule_missing_artifact() {
        let artifacts = BTreeMap::new();
        let outcome = seed_rule().evaluate(&ctx(&artifacts, ApprovalSignal::Approve, true));
        match outcome {
            RuleOutcome::Failed(err) => assert!(err.to_string().contains("has not been produced")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_range_rule_bounds() {
        let mut artifacts = BTreeMap::new();
        for (count, ok) in [("1", true), ("1000", true), ("0", false), ("1001", false)] {
            artifacts.insert(
                "generation_params".to_string(),
                inline("data_generation", &format!(r#"{{"count": {}}}"#, count)),
            );
            let outcome = count_rule().evaluate(&ctx(&artifacts, ApprovalSignal::Inconclusive, false));
            if ok {
                assert_eq!(outcome, RuleOutcome::Satisfied, "count {}", count);
            } else {
                assert!(
                    matches!(outcome, RuleOutcome::Failed(FlowError::Range { .. })),
                    "count {}",
                    count
                );
            }
        }
    }

    #[test]
    fn test_approval_rule_tri_state() {
        let artifacts = BTreeMap::new();
        let rule = ValidationRule::Approval { artifact: None };

        assert!(rule.evaluate(&ctx(&artifacts, ApprovalSignal::Approve, false)).is_satisfied());
        assert!(matches!(
            rule.evaluate(&ctx(&artifacts, ApprovalSignal::Reject, false)),
            RuleOutcome::Pending(_)
        ));
        assert!(matches!(
            rule.evaluate(&ctx(&artifacts, ApprovalSignal::Inconclusive, false)),
            RuleOutcome::Pending(_)
        ));
    }

    #[test]
    fn test_approval_rule_requires_named_artifact() {
        let artifacts = BTreeMap::new();
        let rule = ValidationRule::Approval {
            artifact: Some("seed_data".to_string()),
        };
        assert!(matches!(
            rule.evaluate(&ctx(&artifacts, ApprovalSignal::Approve, false)),
            RuleOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_completed_manual_and_always() {
        let artifacts = BTreeMap::new();
        assert!(
            ValidationRule::Completed
                .evaluate(&ctx(&artifacts, ApprovalSignal::Inconclusive, true))
                .is_satisfied()
        );
        assert!(
            !ValidationRule::Completed
                .evaluate(&ctx(&artifacts, ApprovalSignal::Approve, false))
                .is_satisfied()
        );
        assert!(
            !ValidationRule::Manual
                .evaluate(&ctx(&artifacts, ApprovalSignal::Approve, true))
                .is_satisfied()
        );
        assert!(
            ValidationRule::Always
                .evaluate(&ctx(&artifacts, ApprovalSignal::Reject, false))
                .is_satisfied()
        );
    }

    #[test]
    fn test_all_of_reports_first_unmet_rule() {
        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            "generation_params".to_string(),
            inline("data_generation", r#"{"count": 5}"#),
        );
        let rule = ValidationRule::AllOf {
            rules: vec![count_rule(), ValidationRule::Completed],
        };

        assert!(matches!(
            rule.evaluate(&ctx(&artifacts, ApprovalSignal::Inconclusive, false)),
            RuleOutcome::Pending(_)
        ));
        assert!(
            rule.evaluate(&ctx(&artifacts, ApprovalSignal::Inconclusive, true))
                .is_satisfied()
        );
    }

    #[test]
    fn test_check_document_only_applies_to_named_artifact() {
        let rule = ValidationRule::AllOf {
            rules: vec![seed_rule(), count_rule()],
        };
        assert!(rule.check_document("generation_params", r#"{"count": 10}"#).is_ok());
        assert!(rule.check_document("generation_params", r#"{"count": 0}"#).is_err());
        assert!(rule.check_document("unrelated", "garbage").is_ok());
    }

    #[test]
    fn test_check_definition() {
        assert!(seed_rule().check_definition("s").is_ok());
        let bad = ValidationRule::Range {
            artifact: "p".to_string(),
            field: "count".to_string(),
            min: 10.0,
            max: 1.0,
        };
        assert!(bad.check_definition("s").is_err());
        assert!(
            ValidationRule::AllOf { rules: vec![] }
                .check_definition("s")
                .is_err()
        );
    }

    #[test]
    fn test_rule_yaml_shape() {
        let yaml = r#"
kind: all_of
rules:
  - kind: range
    artifact: generation_params
    field: count
    min: 1
    max: 1000
  - kind: completed
"#;
        let rule: ValidationRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            rule,
            ValidationRule::AllOf {
                rules: vec![count_rule(), ValidationRule::Completed]
            }
        );
        assert!(!rule.requires_approval());
        assert_eq!(rule.structural_artifacts(), vec!["generation_params"]);
        assert_eq!(rule.format_of("generation_params"), None);
    }

    #[test]
    fn test_structural_artifacts_skip_approval() {
        let rule = ValidationRule::AllOf {
            rules: vec![
                seed_rule(),
                ValidationRule::Approval {
                    artifact: Some("notes".to_string()),
                },
            ],
        };
        assert_eq!(rule.structural_artifacts(), vec!["seed_data"]);
        assert_eq!(rule.format_of("seed_data"), Some(ArtifactFormat::Jsonl));
        assert_eq!(rule.format_of("notes"), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            seed_rule().describe(),
            "'seed_data' is valid JSONL with fields [task_description, seed_question, seed_response]"
        );
        assert_eq!(count_rule().describe(), "'generation_params.count' within [1, 1000]");
    }
}
