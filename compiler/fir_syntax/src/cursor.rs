//! Character-level parser state.
//!
//! Tracks a byte position into the source, skips whitespace and `#` line
//! comments between tokens, and records which entity is being parsed so
//! errors can say "while parsing a block".

use fir_ir::display::{is_ident_continue, is_ident_start};

use crate::{ErrorContext, ParseError, Span};

pub(crate) type ParseResult<T> = Result<T, ParseError>;

pub(crate) struct Cursor<'a> {
    source: &'a str,
    pos: usize,
    contexts: Vec<ErrorContext>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            contexts: Vec::new(),
        }
    }

    // ── Position ────────────────────────────────────────────────────

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn rest(&self) -> &'a str {
        self.source.get(self.pos..).unwrap_or("")
    }

    /// Next character without skipping trivia.
    pub(crate) fn peek_raw(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_raw()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Source text from `start` up to the current position.
    pub(crate) fn slice(&self, start: usize) -> &'a str {
        self.source.get(start..self.pos).unwrap_or("")
    }

    pub(crate) fn span_from(&self, start: usize) -> Span {
        Span::from_range(start..self.pos)
    }

    // ── Trivia ──────────────────────────────────────────────────────

    pub(crate) fn skip_trivia(&mut self) {
        loop {
            match self.peek_raw() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    /// Next significant character.
    pub(crate) fn peek(&mut self) -> Option<char> {
        self.skip_trivia();
        self.peek_raw()
    }

    pub(crate) fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    pub(crate) fn at(&mut self, token: &str) -> bool {
        self.skip_trivia();
        self.rest().starts_with(token)
    }

    /// Consume `token` if it comes next.
    pub(crate) fn eat(&mut self, token: &str) -> bool {
        if self.at(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token: &str) -> ParseResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{token}`")))
        }
    }

    /// Consume `word` if it comes next as a whole word.
    pub(crate) fn eat_keyword(&mut self, word: &str) -> bool {
        if !self.at(word) {
            return false;
        }
        let follows = self.rest()[word.len()..].chars().next();
        if follows.is_some_and(is_ident_continue) {
            return false;
        }
        self.pos += word.len();
        true
    }

    pub(crate) fn expect_end(&mut self) -> ParseResult<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    // ── Tokens ──────────────────────────────────────────────────────

    /// A plain identifier word, which may be a keyword. Returns `None`
    /// without consuming anything if no identifier starts here.
    pub(crate) fn word(&mut self) -> Option<&'a str> {
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        let start = self.pos;
        while self.peek_raw().is_some_and(is_ident_continue) {
            self.bump();
        }
        self.source.get(start..self.pos)
    }

    /// Backtick-quoted identifier, opening backtick already consumed.
    pub(crate) fn quoted_ident(&mut self) -> ParseResult<String> {
        let start = self.pos;
        let mut name = String::new();
        loop {
            match self.bump() {
                Some('`') => return Ok(name),
                Some('\\') => match self.bump() {
                    Some(c @ ('`' | '\\')) => name.push(c),
                    _ => return Err(self.error_at(start, "invalid escape in quoted name")),
                },
                Some(c) => name.push(c),
                None => return Err(self.error_at(start, "unterminated quoted name")),
            }
        }
    }

    /// Identifier that is not a keyword, or any quoted identifier.
    pub(crate) fn ident(&mut self) -> ParseResult<String> {
        if self.eat("`") {
            return self.quoted_ident();
        }
        let start = self.pos;
        match self.word() {
            Some(w) if !fir_ir::display::KEYWORDS.contains(&w) => Ok(w.to_owned()),
            Some(w) => {
                self.pos = start;
                Err(self.error_here(&format!("expected a name, found keyword `{w}`")))
            }
            None => Err(self.unexpected("a name")),
        }
    }

    /// String literal body, opening quote already consumed.
    pub(crate) fn string_body(&mut self) -> ParseResult<String> {
        let start = self.pos;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => {
                    let c = match self.bump() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        _ => return Err(self.error_at(start, "invalid escape in string")),
                    };
                    value.push(c);
                }
                Some(c) => value.push(c),
                None => return Err(self.error_at(start, "unterminated string")),
            }
        }
    }

    /// Consume the longest run of characters matching `pred`.
    pub(crate) fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek_raw().is_some_and(&pred) {
            self.bump();
        }
        self.source.get(start..self.pos).unwrap_or("")
    }

    /// Consume one raw character if it satisfies `pred`.
    pub(crate) fn eat_raw_if(&mut self, pred: impl Fn(char) -> bool) -> Option<char> {
        let c = self.peek_raw().filter(|&c| pred(c))?;
        self.bump();
        Some(c)
    }

    // ── Contexts and errors ─────────────────────────────────────────

    pub(crate) fn push_context(&mut self, context: ErrorContext) {
        self.contexts.push(context);
    }

    pub(crate) fn pop_context(&mut self) {
        self.contexts.pop();
    }

    pub(crate) fn error_span(&self, span: Span, message: &str) -> ParseError {
        let (line, column) = span.line_col(self.source);
        ParseError {
            span,
            line,
            column,
            message: message.to_owned(),
            context: self.contexts.last().copied(),
        }
    }

    pub(crate) fn error_at(&self, start: usize, message: &str) -> ParseError {
        self.error_span(self.span_from(start), message)
    }

    pub(crate) fn error_here(&self, message: &str) -> ParseError {
        self.error_span(Span::from_range(self.pos..self.pos), message)
    }

    pub(crate) fn unexpected(&mut self, expected: &str) -> ParseError {
        let message = match self.peek() {
            Some(c) => format!("expected {expected}, found `{c}`"),
            None => format!("expected {expected}, found end of input"),
        };
        self.error_here(&message)
    }
}
