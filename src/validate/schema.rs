//! Structural validation of artifact documents.
//!
//! Artifacts are JSON documents (one object, or an array of objects) or JSONL
//! documents (one object per non-blank line). Seed data, for example, is JSONL
//! where every record must carry non-empty `task_description`,
//! `seed_question` and `seed_response` strings.

use super::ArtifactFormat;
use crate::error::{FlowError, Result};
use serde_json::{Map, Value};

/// A parsed record: one JSON object.
pub type Record = Map<String, Value>;

/// Parse an artifact document into records.
///
/// Fails with a schema error naming the offending line or position when the
/// document does not parse, contains non-object values, or holds no records.
pub fn parse_records(artifact: &str, text: &str, format: ArtifactFormat) -> Result<Vec<Record>> {
    let records = match format {
        ArtifactFormat::Json => parse_json(artifact, text)?,
        ArtifactFormat::Jsonl => parse_jsonl(artifact, text)?,
    };

    if records.is_empty() {
        return Err(FlowError::schema(artifact, "(document)", "contains no records"));
    }

    Ok(records)
}

fn parse_json(artifact: &str, text: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        FlowError::schema(artifact, "(document)", format!("is not valid JSON: {}", e))
    })?;

    match value {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                _ => Err(FlowError::schema(
                    artifact,
                    format!("[{}]", i),
                    "must be a JSON object",
                )),
            })
            .collect(),
        _ => Err(FlowError::schema(
            artifact,
            "(document)",
            "must be a JSON object or an array of objects",
        )),
    }
}

fn parse_jsonl(artifact: &str, text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line).map_err(|e| {
            FlowError::schema(
                artifact,
                format!("line {}", idx + 1),
                format!("is not valid JSON: {}", e),
            )
        })?;

        match value {
            Value::Object(map) => records.push(map),
            _ => {
                return Err(FlowError::schema(
                    artifact,
                    format!("line {}", idx + 1),
                    "must be a JSON object",
                ));
            }
        }
    }

    Ok(records)
}

/// Check that every record carries every required field as a non-empty string.
pub fn check_required_fields(artifact: &str, records: &[Record], required: &[String]) -> Result<()> {
    for (idx, record) in records.iter().enumerate() {
        for field in required {
            let location = if records.len() > 1 {
                format!(" (record {})", idx + 1)
            } else {
                String::new()
            };

            match record.get(field) {
                None => {
                    return Err(FlowError::schema(
                        artifact,
                        field,
                        format!("is missing{}", location),
                    ));
                }
                Some(Value::String(s)) if s.trim().is_empty() => {
                    return Err(FlowError::schema(
                        artifact,
                        field,
                        format!("must be a non-empty string{}", location),
                    ));
                }
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(FlowError::schema(
                        artifact,
                        field,
                        format!("must be a string{}", location),
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Parse a document and check its required fields in one step.
///
/// Returns the number of records on success.
pub fn validate_document(
    artifact: &str,
    text: &str,
    format: ArtifactFormat,
    required: &[String],
) -> Result<usize> {
    let records = parse_records(artifact, text, format)?;
    check_required_fields(artifact, &records, required)?;
    Ok(records.len())
}

/// Read a numeric field from the first record of a document.
///
/// Numbers and numeric strings are accepted.
pub fn numeric_field(artifact: &str, records: &[Record], field: &str) -> Result<f64> {
    let value = records
        .first()
        .and_then(|r| r.get(field))
        .ok_or_else(|| FlowError::schema(artifact, field, "is missing"))?;

    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FlowError::schema(artifact, field, "is not a finite number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| FlowError::schema(artifact, field, "must be a number")),
        _ => Err(FlowError::schema(artifact, field, "must be a number")),
    }
}
