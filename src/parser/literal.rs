//! Reader for the JavaScript expression subset used in config blocks and
//! `${...}` placeholders
//!
//! Covers literals (null, booleans, numbers, strings, template strings,
//! arrays, objects), identifier paths (`a.b.c`) and calls (`f(x, y)`).
//! Anything outside that subset is a [`LiteralError`] and is left to the
//! script evaluator.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub message: String,
    pub offset: usize,
}

/// Deepest nesting of arrays, objects, calls and parentheses accepted
pub const MAX_DEPTH: usize = 256;

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Str(String),
    /// Raw text between backticks, placeholders unexpanded
    Template(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Ident(String),
    Member(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
}

impl Expr {
    /// Convert a pure literal to JSON; `None` if any part needs evaluation
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;
        Some(match self {
            Expr::Null => Value::Null,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Number(n) => Value::Number(n.clone()),
            Expr::Str(s) => Value::String(s.clone()),
            Expr::Template(raw) if !raw.contains("${") => Value::String(unescape(raw)),
            Expr::Array(items) => Value::Array(
                items
                    .iter()
                    .map(Expr::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Expr::Object(entries) => {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json()?);
                }
                Value::Object(map)
            }
            _ => return None,
        })
    }

    /// `a.b.c` as segments, if this is a plain identifier path
    pub fn path(&self) -> Option<Vec<&str>> {
        match self {
            Expr::Ident(name) => Some(vec![name.as_str()]),
            Expr::Member(object, property) => {
                let mut path = object.path()?;
                path.push(property.as_str());
                Some(path)
            }
            _ => None,
        }
    }
}

/// Parse a complete expression; trailing input is an error
pub fn parse_expression(source: &str) -> Result<Expr, LiteralError> {
    let mut parser = Parser::new(source);
    let expr = parser.expression()?;
    parser.skip_trivia();
    if parser.pos < parser.bytes.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

/// Parse the inside of a `config { ... }` block as an object literal
pub fn parse_object_body(content: &str) -> Result<Expr, LiteralError> {
    parse_expression(&format!("{{{}}}", content))
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            message: message.to_string(),
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            let rest = &self.bytes[self.pos..];
            if rest.starts_with(b"//") {
                while self.peek().is_some_and(|b| b != b'\n') {
                    self.pos += 1;
                }
            } else if rest.starts_with(b"/*") {
                match self.source[self.pos + 2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => self.pos = self.bytes.len(),
                }
            } else {
                return;
            }
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_trivia();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), LiteralError> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn expression(&mut self) -> Result<Expr, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let expr = self.postfix();
        self.depth -= 1;
        expr
    }

    fn postfix(&mut self) -> Result<Expr, LiteralError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(b'.') {
                let property = self.identifier()?;
                expr = Expr::Member(Box::new(expr), property);
            } else if self.eat(b'(') {
                let args = self.list(b')')?;
                expr = Expr::Call(Box::new(expr), args);
            } else if self.eat(b'[') {
                let index = self.expression()?;
                self.expect(b']')?;
                match index {
                    Expr::Str(key) => expr = Expr::Member(Box::new(expr), key),
                    _ => return Err(self.error("computed member access")),
                }
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, LiteralError> {
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'\'') | Some(b'"') => self.string().map(Expr::Str),
            Some(b'`') => self.template(),
            Some(b'[') => {
                self.pos += 1;
                self.list(b']').map(Expr::Array)
            }
            Some(b'{') => {
                self.pos += 1;
                self.object()
            }
            Some(b'(') => {
                self.pos += 1;
                let inner = self.expression()?;
                self.expect(b')')?;
                Ok(inner)
            }
            Some(b'-') | Some(b'.') | Some(b'0'..=b'9') => self.number(),
            Some(b) if is_ident_start(b) => {
                let word = self.identifier()?;
                Ok(match word.as_str() {
                    "null" => Expr::Null,
                    "true" => Expr::Bool(true),
                    "false" => Expr::Bool(false),
                    _ => Expr::Ident(word),
                })
            }
            Some(_) => Err(self.error("unsupported syntax")),
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed
    fn list(&mut self, close: u8) -> Result<Vec<Expr>, LiteralError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.expression()?);
            if !self.eat(b',') {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn object(&mut self) -> Result<Expr, LiteralError> {
        let mut entries = Vec::new();
        loop {
            if self.eat(b'}') {
                return Ok(Expr::Object(entries));
            }
            self.skip_trivia();
            let key = match self.peek() {
                Some(b'\'') | Some(b'"') => self.string()?,
                Some(b'0'..=b'9') => match self.number()? {
                    Expr::Number(n) => n.to_string(),
                    _ => return Err(self.error("invalid key")),
                },
                _ => self.identifier()?,
            };
            self.expect(b':')?;
            let value = self.expression()?;
            entries.push((key, value));
            if !self.eat(b',') {
                self.expect(b'}')?;
                return Ok(Expr::Object(entries));
            }
        }
    }

    fn identifier(&mut self) -> Result<String, LiteralError> {
        self.skip_trivia();
        let start = self.pos;
        if !self.peek().is_some_and(is_ident_start) {
            return Err(self.error("expected identifier"));
        }
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        Ok(self.source[start..self.pos].to_string())
    }

    fn number(&mut self) -> Result<Expr, LiteralError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'_'))
        {
            // Exponent sign
            if matches!(self.peek(), Some(b'e') | Some(b'E'))
                && matches!(self.bytes.get(self.pos + 1), Some(b'+') | Some(b'-'))
            {
                self.pos += 1;
            }
            self.pos += 1;
        }
        let text = self.source[start..self.pos].replace('_', "");
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Expr::Number(int.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Expr::Number)
            .ok_or_else(|| LiteralError {
                message: format!("invalid number '{}'", text),
                offset: start,
            })
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self.bytes[self.pos];
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\\' {
                self.pos += 2;
                continue;
            }
            if b == quote {
                let raw = &self.source[content_start..self.pos];
                self.pos += 1;
                return Ok(unescape(raw));
            }
            self.pos += 1;
        }
        Err(LiteralError {
            message: "unterminated string".to_string(),
            offset: start,
        })
    }

    fn template(&mut self) -> Result<Expr, LiteralError> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\\' {
                self.pos += 2;
                continue;
            }
            if b == b'`' {
                let raw = self.source[content_start..self.pos].to_string();
                self.pos += 1;
                return Ok(Expr::Template(raw));
            }
            self.pos += 1;
        }
        Err(LiteralError {
            message: "unterminated template string".to_string(),
            offset: start,
        })
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Resolve JavaScript string escapes
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('\n') => {}
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
