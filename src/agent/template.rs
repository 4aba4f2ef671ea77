//! `{variable}` substitution for agent command templates.
//!
//! `{name}` is replaced by the variable's value, `{{` and `}}` render literal
//! braces. Unknown variables are an error rather than an empty string.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("undefined variable '{name}' at position {position}")]
    UndefinedVariable { name: String, position: usize },

    #[error("unmatched '{{' at position {position}")]
    UnmatchedBrace { position: usize },

    #[error("empty variable name at position {position}")]
    EmptyVariableName { position: usize },
}

enum Piece<'a> {
    Text(&'a str),
    Var { name: &'a str, position: usize },
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let mut pieces = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(idx) = rest.find(['{', '}']) {
        let (before, tail) = rest.split_at(idx);
        if !before.is_empty() {
            pieces.push(Piece::Text(before));
        }
        let position = offset + idx;

        if let Some(after) = tail.strip_prefix("{{") {
            pieces.push(Piece::Text("{"));
            offset = position + 2;
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            pieces.push(Piece::Text("}"));
            offset = position + 2;
            rest = after;
        } else if let Some(after) = tail.strip_prefix('}') {
            // A lone closing brace is literal.
            pieces.push(Piece::Text("}"));
            offset = position + 1;
            rest = after;
        } else {
            let body = &tail[1..];
            let close = body
                .find('}')
                .ok_or(TemplateError::UnmatchedBrace { position })?;
            let name = body[..close].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyVariableName { position });
            }
            pieces.push(Piece::Var { name, position });
            offset = position + close + 2;
            rest = &body[close + 1..];
        }
    }

    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    Ok(pieces)
}

/// Render `template` with `variables`.
pub fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    for piece in parse(template)? {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Var { name, position } => match variables.get(name) {
                Some(value) => out.push_str(value),
                None => {
                    return Err(TemplateError::UndefinedVariable {
                        name: name.to_string(),
                        position,
                    });
                }
            },
        }
    }
    Ok(out)
}

/// Check a template against the set of variables it may use.
pub fn check_template(template: &str, allowed: &[&str]) -> Result<(), TemplateError> {
    for piece in parse(template)? {
        if let Piece::Var { name, position } = piece
            && !allowed.contains(&name)
        {
            return Err(TemplateError::UndefinedVariable {
                name: name.to_string(),
                position,
            });
        }
    }
    Ok(())
}
