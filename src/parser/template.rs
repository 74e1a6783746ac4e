//! `${...}` placeholder scanning for SQL templates

use thiserror::Error;

use super::lexer::{find_matching_brace, line_of, Dialect};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unclosed \"${{\" placeholder starting on line {line}")]
pub struct TemplateError {
    pub line: usize,
}

/// Piece of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// Expression source between `${` and the matching `}`
    Placeholder(String),
}

/// Split a template into text and placeholder segments
///
/// `\${` is an escaped literal `${`. Any other backslash is kept as written.
/// Placeholder expressions are brace-matched with JavaScript quoting rules.
pub fn segments(template: &str) -> Result<Vec<Segment>, TemplateError> {
    let bytes = template.as_bytes();
    let mut out = Vec::new();
    let mut text = String::new();
    let mut last = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos..].starts_with(b"\\${") {
            text.push_str(&template[last..pos]);
            text.push_str("${");
            pos += 3;
            last = pos;
            continue;
        }
        if bytes[pos..].starts_with(b"${") {
            text.push_str(&template[last..pos]);
            if !text.is_empty() {
                out.push(Segment::Text(std::mem::take(&mut text)));
            }
            let open = pos + 2;
            let close = find_matching_brace(template, Dialect::JavaScript, open).ok_or(
                TemplateError {
                    line: line_of(template, pos),
                },
            )?;
            out.push(Segment::Placeholder(template[open..close].to_string()));
            pos = close + 1;
            last = pos;
            continue;
        }
        pos += 1;
    }

    text.push_str(&template[last..]);
    if !text.is_empty() {
        out.push(Segment::Text(text));
    }
    Ok(out)
}
