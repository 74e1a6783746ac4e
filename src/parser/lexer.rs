//! Lexical scanner shared by the block extractor and the template scanner
//!
//! The scanner walks text left to right and yields [`Unit`]s: single code
//! characters, whole comments, or whole quoted literals. Comment and string
//! openers are only recognized in [`LexState::Normal`]; once inside, only that
//! state's own terminator ends it, and a backslash always consumes the byte
//! after it. Everything is reported as byte ranges into the input, so callers
//! can slice the original text without re-encoding anything.

/// Which comment and quote syntax applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `--` and `/* */` comments; `'`, `"`, `'''`, `"""` and backtick quoting
    Sql,
    /// `//` and `/* */` comments; `'`, `"` and template-literal quoting
    JavaScript,
}

/// Lexical state of the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    Normal,
    LineComment,
    BlockComment,
    SingleQuoted,
    DoubleQuoted,
    TripleSingleQuoted,
    TripleDoubleQuoted,
    Backtick,
}

impl LexState {
    fn opener_len(self) -> usize {
        match self {
            LexState::Normal => 0,
            LexState::LineComment | LexState::BlockComment => 2,
            LexState::TripleSingleQuoted | LexState::TripleDoubleQuoted => 3,
            LexState::SingleQuoted | LexState::DoubleQuoted | LexState::Backtick => 1,
        }
    }

    fn terminator(self) -> &'static [u8] {
        match self {
            LexState::Normal => b"",
            LexState::LineComment => b"\n",
            LexState::BlockComment => b"*/",
            LexState::SingleQuoted => b"'",
            LexState::DoubleQuoted => b"\"",
            LexState::TripleSingleQuoted => b"'''",
            LexState::TripleDoubleQuoted => b"\"\"\"",
            LexState::Backtick => b"`",
        }
    }

    fn unit_kind(self) -> UnitKind {
        match self {
            LexState::Normal => UnitKind::Code,
            LexState::LineComment | LexState::BlockComment => UnitKind::Comment,
            _ => UnitKind::Literal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// One character outside any comment or literal
    Code,
    Comment,
    Literal,
}

/// A scanned span of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub kind: UnitKind,
    pub state: LexState,
    pub start: usize,
    pub end: usize,
    /// False when a literal or block comment runs to end of input
    pub terminated: bool,
}

impl Unit {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// First byte of a code unit
    pub fn byte(&self, source: &str) -> u8 {
        source.as_bytes()[self.start]
    }
}

/// Iterator over the [`Unit`]s of some text
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    dialect: Dialect,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str, dialect: Dialect) -> Self {
        Self::at(text, dialect, 0)
    }

    /// Start scanning at byte offset `pos`, which must be a char boundary
    pub fn at(text: &'a str, dialect: Dialect, pos: usize) -> Self {
        Self { text, dialect, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Continue scanning from `pos`
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.text.len());
    }

    fn opening_state(&self, at: usize) -> LexState {
        let rest = &self.text.as_bytes()[at..];
        let starts = |prefix: &[u8]| rest.starts_with(prefix);
        match self.dialect {
            Dialect::Sql if starts(b"--") => LexState::LineComment,
            Dialect::JavaScript if starts(b"//") => LexState::LineComment,
            _ if starts(b"/*") => LexState::BlockComment,
            Dialect::Sql if starts(b"'''") => LexState::TripleSingleQuoted,
            Dialect::Sql if starts(b"\"\"\"") => LexState::TripleDoubleQuoted,
            _ if starts(b"'") => LexState::SingleQuoted,
            _ if starts(b"\"") => LexState::DoubleQuoted,
            _ if starts(b"`") => LexState::Backtick,
            _ => LexState::Normal,
        }
    }

    /// Advance past the body of `state`; returns whether its terminator was found
    fn consume_until_terminator(&mut self, state: LexState) -> bool {
        let bytes = self.text.as_bytes();
        let terminator = state.terminator();
        let escapes = !matches!(state, LexState::LineComment | LexState::BlockComment);

        while self.pos < bytes.len() {
            if escapes && bytes[self.pos] == b'\\' {
                self.pos = (self.pos + 2).min(bytes.len());
                continue;
            }
            if bytes[self.pos..].starts_with(terminator) {
                // The newline ending a line comment belongs to the code after it.
                if state != LexState::LineComment {
                    self.pos += terminator.len();
                }
                return true;
            }
            self.pos += 1;
        }
        // A line comment may legitimately end at end of input.
        state == LexState::LineComment
    }

    fn next_char_boundary(&self, from: usize) -> usize {
        let mut end = from + 1;
        while end < self.text.len() && !self.text.is_char_boundary(end) {
            end += 1;
        }
        end
    }
}

impl Iterator for Scanner<'_> {
    type Item = Unit;

    fn next(&mut self) -> Option<Unit> {
        let start = self.pos;
        if start >= self.text.len() {
            return None;
        }

        let state = self.opening_state(start);
        if state == LexState::Normal {
            self.pos = self.next_char_boundary(start);
            return Some(Unit {
                kind: UnitKind::Code,
                state,
                start,
                end: self.pos,
                terminated: true,
            });
        }

        self.pos = start + state.opener_len();
        let terminated = self.consume_until_terminator(state);
        Some(Unit {
            kind: state.unit_kind(),
            state,
            start,
            end: self.pos,
            terminated,
        })
    }
}

/// Find the `}` matching an already-consumed `{`, scanning from `from`
///
/// Braces inside comments and literals are ignored.
pub fn find_matching_brace(text: &str, dialect: Dialect, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for unit in Scanner::at(text, dialect, from) {
        if unit.kind != UnitKind::Code {
            continue;
        }
        match unit.byte(text) {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(unit.start);
                }
            }
            _ => {}
        }
    }
    None
}

/// 1-based line number of byte offset `pos`
pub fn line_of(text: &str, pos: usize) -> usize {
    text.as_bytes()[..pos.min(text.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}
