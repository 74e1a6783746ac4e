//! Block extraction for SQL-template (`.sqlx`) files
//!
//! A file is a SQL body with optional top-level keyword blocks:
//!
//! ```text
//! config { type: "table" }
//! js { const x = 1; }
//! pre_operations { SET x = 1 }
//! SELECT ${x} AS y
//! post_operations { DROP TABLE tmp }
//! ```
//!
//! Keyword blocks are only recognized outside comments and quoted text.
//! Everything that is not part of a block (keyword, braces and content) is
//! the body, kept byte-for-byte.

pub mod lexer;
pub mod literal;
pub mod template;


use serde::Serialize;
use thiserror::Error;

use lexer::{find_matching_brace, line_of, Dialect, Scanner, UnitKind};

/// Recoverable message for a statement separator at the end of SQL
pub const TRAILING_SEMICOLON_MESSAGE: &str =
    "Semi-colons are not allowed at the end of SQL statements.";

/// Line that separates statements in an operations body
const STATEMENT_SEPARATOR: &str = "---";

/// Blocks extracted from one SQL-template file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlxBlocks {
    /// Content of `config { ... }`, without the braces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// Concatenated content of every `js { ... }` block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub pre_operations: Vec<String>,
    pub post_operations: Vec<String>,
    pub body: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Unclosed \"{keyword}\" block starting on line {line}")]
    UnclosedBlock { keyword: &'static str, line: usize },

    #[error("Only one \"config\" block is allowed per file (second one on line {line})")]
    DuplicateConfig { line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Config,
    Js,
    PreOperations,
    PostOperations,
}

impl BlockKind {
    const ALL: [BlockKind; 4] = [
        BlockKind::Config,
        BlockKind::Js,
        BlockKind::PreOperations,
        BlockKind::PostOperations,
    ];

    fn keyword(self) -> &'static str {
        match self {
            BlockKind::Config => "config",
            BlockKind::Js => "js",
            BlockKind::PreOperations => "pre_operations",
            BlockKind::PostOperations => "post_operations",
        }
    }

    fn dialect(self) -> Dialect {
        match self {
            BlockKind::Config | BlockKind::Js => Dialect::JavaScript,
            BlockKind::PreOperations | BlockKind::PostOperations => Dialect::Sql,
        }
    }
}

struct BlockMatch {
    kind: BlockKind,
    content_start: usize,
    content_end: usize,
    /// Offset just past the closing brace
    end: usize,
}

/// Split a SQL-template file into its blocks and body
pub fn extract_blocks(text: &str) -> Result<SqlxBlocks, ExtractError> {
    let mut blocks = SqlxBlocks::default();
    let mut scripts: Vec<&str> = Vec::new();
    let mut last = 0;
    let mut scanner = Scanner::new(text, Dialect::Sql);

    while let Some(unit) = scanner.next() {
        if unit.kind != UnitKind::Code {
            continue;
        }
        let Some(found) = match_block(text, unit.start)? else {
            continue;
        };

        blocks.body.push_str(&text[last..unit.start]);
        let content = &text[found.content_start..found.content_end];
        match found.kind {
            BlockKind::Config => {
                if blocks.config.is_some() {
                    return Err(ExtractError::DuplicateConfig {
                        line: line_of(text, unit.start),
                    });
                }
                blocks.config = Some(content.to_string());
            }
            BlockKind::Js => scripts.push(content),
            BlockKind::PreOperations => blocks.pre_operations.push(content.to_string()),
            BlockKind::PostOperations => blocks.post_operations.push(content.to_string()),
        }
        scanner.seek(found.end);
        last = found.end;
    }

    blocks.body.push_str(&text[last..]);
    if !scripts.is_empty() {
        blocks.script = Some(scripts.join("\n"));
    }
    Ok(blocks)
}

/// Match `keyword { ... }` starting at `pos`
fn match_block(text: &str, pos: usize) -> Result<Option<BlockMatch>, ExtractError> {
    let bytes = text.as_bytes();
    if pos > 0 && is_word_byte(bytes[pos - 1]) {
        return Ok(None);
    }

    for kind in BlockKind::ALL {
        let keyword = kind.keyword();
        if !text[pos..].starts_with(keyword) {
            continue;
        }
        let mut cursor = pos + keyword.len();
        if cursor < bytes.len() && is_word_byte(bytes[cursor]) {
            continue;
        }
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if bytes.get(cursor) != Some(&b'{') {
            continue;
        }

        let content_start = cursor + 1;
        let close = find_matching_brace(text, kind.dialect(), content_start).ok_or(
            ExtractError::UnclosedBlock {
                keyword,
                line: line_of(text, pos),
            },
        )?;
        return Ok(Some(BlockMatch {
            kind,
            content_start,
            content_end: close,
            end: close + 1,
        }));
    }
    Ok(None)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.'
}

/// Whether the last significant token of `sql` is a `;`
///
/// Comments and trailing whitespace are ignored; a `;` inside a string is not
/// a statement separator.
pub fn has_trailing_semicolon(sql: &str) -> bool {
    let mut last_significant = None;
    for unit in Scanner::new(sql, Dialect::Sql) {
        match unit.kind {
            UnitKind::Comment => {}
            UnitKind::Literal => last_significant = Some(b'\''),
            UnitKind::Code => {
                let byte = unit.byte(sql);
                if !byte.is_ascii_whitespace() {
                    last_significant = Some(byte);
                }
            }
        }
    }
    last_significant == Some(b';')
}

/// Split an operations body into statements on lines that are exactly `---`
///
/// Separators inside quoted text or block comments do not split. Empty
/// statements are dropped and the rest are trimmed.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut last = 0;
    for unit in Scanner::new(sql, Dialect::Sql) {
        if unit.kind != UnitKind::Comment || unit.text(sql).trim_end() != STATEMENT_SEPARATOR {
            continue;
        }
        let line_start = sql[..unit.start].rfind('\n').map_or(0, |i| i + 1);
        if !sql[line_start..unit.start].trim().is_empty() {
            continue;
        }
        statements.push(&sql[last..line_start]);
        last = unit.end;
    }
    statements.push(&sql[last..]);

    statements
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Default action name for a file: its stem
///
/// `definitions/reporting/daily.sqlx` becomes `daily`; the `.dp` marker of
/// data-preparation files is dropped too (`clean.dp.yaml` becomes `clean`).
pub fn derive_action_name(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let stem = match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(dot) => &file_name[..dot],
    };
    stem.strip_suffix(".dp").unwrap_or(stem).to_string()
}
