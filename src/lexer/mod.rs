//! Lexer for AIQL source text
//!
//! Converts source text into a flat sequence of typed tokens with 1-based
//! line/column positions, terminated by a single `Eof` token.
//!
//! Several characters are overloaded in the surface syntax and are resolved
//! here with bounded lookahead:
//!
//! - `<` opens a concept (`<Python>`) or is the less-than operator (`<10`, `x < y`)
//! - `[` opens a relation (`[is_a]`) or a list literal (`[a, b]`)
//! - `/` opens a line or block comment, or is division
//! - `#`, `$`, `~` and `@` each come in single and doubled or named forms

mod token;

pub use token::{Token, TokenKind};

use tracing::trace;

/// Default cap on input size (10 MiB)
pub const DEFAULT_MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// How far `<` may look ahead for a closing `>` before it is read as less-than
pub const CONCEPT_LOOKAHEAD: usize = 256;

/// Characters that end a concept scan after `<`
const CONCEPT_BREAKERS: &[char] = &['<', '{', '}', '(', ')', '[', ']', ',', ';', '"'];

/// Characters that mark a `[` as opening a list literal
const LIST_MARKERS: &[char] = &[',', '<', '{', '(', '$', '"', '['];

/// Lexical error, always fatal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("Unterminated string literal starting at {line}:{column}")]
    UnterminatedString { line: usize, column: usize },

    #[error("Unterminated relation starting at {line}:{column}")]
    UnterminatedRelation { line: usize, column: usize },

    #[error("Unterminated block comment starting at {line}:{column}")]
    UnterminatedComment { line: usize, column: usize },

    #[error("Input of {size} bytes exceeds the limit of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Unexpected character '{ch}' at {line}:{column}")]
    UnexpectedCharacter { ch: char, line: usize, column: usize },

    #[error("Invalid number '{text}' at {line}:{column}")]
    InvalidNumber { text: String, line: usize, column: usize },

    #[error("{message} at {line}:{column}")]
    Malformed { message: String, line: usize, column: usize },
}

impl LexError {
    /// Source position of the error, if it has one
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            LexError::UnterminatedString { line, column }
            | LexError::UnterminatedRelation { line, column }
            | LexError::UnterminatedComment { line, column }
            | LexError::UnexpectedCharacter { line, column, .. }
            | LexError::InvalidNumber { line, column, .. }
            | LexError::Malformed { line, column, .. } => Some((*line, *column)),
            LexError::InputTooLarge { .. } => None,
        }
    }
}

/// Lexer options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexerOptions {
    /// Inputs larger than this are rejected before scanning
    pub max_input_bytes: usize,
    /// Emit `Comment` tokens instead of discarding comments
    pub preserve_comments: bool,
}

impl Default for LexerOptions {
    fn default() -> Self {
        LexerOptions {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            preserve_comments: false,
        }
    }
}

/// Tokenize source text with default options
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

/// Lexer for AIQL source text
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    options: LexerOptions,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_options(source, LexerOptions::default())
    }

    pub fn with_options(source: &'a str, options: LexerOptions) -> Self {
        Lexer {
            source,
            chars: Vec::new(),
            pos: 0,
            line: 1,
            column: 1,
            options,
            tokens: Vec::new(),
        }
    }

    /// Consume the whole input and return its tokens
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        if self.source.len() > self.options.max_input_bytes {
            return Err(LexError::InputTooLarge {
                size: self.source.len(),
                limit: self.options.max_input_bytes,
            });
        }
        self.chars = self.source.chars().collect();

        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            let (start, count) = (self.pos, self.tokens.len());
            self.scan_token()?;
            if let Some(token) = self.tokens.get_mut(count) {
                token.lexeme = self.chars[start..self.pos].iter().collect();
            }
        }

        let (line, column) = (self.line, self.column);
        self.tokens.push(Token::new(TokenKind::Eof, "", line, column));
        trace!(tokens = self.tokens.len(), "tokenized input");
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, value: impl Into<String>, line: usize, column: usize) {
        self.tokens.push(Token::new(kind, value, line, column));
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_token(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(()),
        };

        match c {
            '!' => self.scan_bang(line, column),
            '<' => {
                self.scan_angle(line, column);
                Ok(())
            }
            '[' => self.scan_bracket(line, column),
            '/' => self.scan_slash(line, column),
            '#' => self.scan_hash(line, column),
            '$' => self.scan_dollar(line, column),
            '~' => self.scan_tilde(line, column),
            '@' => self.scan_at(line, column),
            '"' => self.scan_string(line, column),
            '0'..='9' => {
                let text = self.read_number(c, line, column)?;
                self.push(TokenKind::Number, text, line, column);
                Ok(())
            }
            c if c.is_alphabetic() || c == '_' => {
                let word = self.read_word(c);
                let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Identifier);
                self.push(kind, word, line, column);
                Ok(())
            }
            '=' => {
                if self.advance_if('=') {
                    self.push(TokenKind::EqEq, "==", line, column);
                } else if self.advance_if('>') {
                    self.push(TokenKind::FatArrow, "=>", line, column);
                } else {
                    self.push(TokenKind::Assign, "=", line, column);
                }
                Ok(())
            }
            '-' => {
                if self.advance_if('>') {
                    self.push(TokenKind::Arrow, "->", line, column);
                } else {
                    self.push(TokenKind::Minus, "-", line, column);
                }
                Ok(())
            }
            '>' => {
                if self.advance_if('=') {
                    self.push(TokenKind::Gte, ">=", line, column);
                } else {
                    self.push(TokenKind::Gt, ">", line, column);
                }
                Ok(())
            }
            '+' => {
                self.push(TokenKind::Plus, "+", line, column);
                Ok(())
            }
            '*' => {
                self.push(TokenKind::Star, "*", line, column);
                Ok(())
            }
            '%' => {
                self.push(TokenKind::Percent, "%", line, column);
                Ok(())
            }
            '^' => {
                self.push(TokenKind::Caret, "^", line, column);
                Ok(())
            }
            '{' | '}' | '(' | ')' | ',' | ':' | ';' | '.' | ']' => {
                self.push(TokenKind::Symbol, c.to_string(), line, column);
                Ok(())
            }
            _ => Err(LexError::UnexpectedCharacter { ch: c, line, column }),
        }
    }

    /// `!=` or an intent marker `!Name`
    fn scan_bang(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        if self.advance_if('=') {
            self.push(TokenKind::NotEq, "!=", line, column);
            return Ok(());
        }
        match self.peek() {
            Some(c) if c.is_alphabetic() => {
                self.advance();
                let name = self.read_word(c);
                self.push(TokenKind::Intent, name, line, column);
                Ok(())
            }
            _ => Err(LexError::UnexpectedCharacter { ch: '!', line, column }),
        }
    }

    /// `<=`, a concept `<Name>`, or `<`
    fn scan_angle(&mut self, line: usize, column: usize) {
        if self.advance_if('=') {
            self.push(TokenKind::Lte, "<=", line, column);
            return;
        }

        let mut len = 0;
        let mut closed = false;
        while len < CONCEPT_LOOKAHEAD {
            match self.peek_at(len) {
                Some('>') => {
                    closed = len > 0;
                    break;
                }
                Some(c) if c.is_whitespace() || CONCEPT_BREAKERS.contains(&c) => break,
                Some(_) => len += 1,
                None => break,
            }
        }

        if !closed {
            self.push(TokenKind::Lt, "<", line, column);
            return;
        }

        let mut text = String::from("<");
        for _ in 0..len {
            if let Some(c) = self.advance() {
                text.push(c);
            }
        }
        self.advance();
        text.push('>');
        self.push(TokenKind::Concept, text, line, column);
    }

    /// A relation `[name]` or a list-open symbol
    fn scan_bracket(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        let mut len = 0;
        let is_list = loop {
            match self.peek_at(len) {
                Some(']') => break len == 0,
                Some(c) if LIST_MARKERS.contains(&c) => break true,
                Some(_) => len += 1,
                None => return Err(LexError::UnterminatedRelation { line, column }),
            }
        };

        if is_list {
            self.push(TokenKind::Symbol, "[", line, column);
            return Ok(());
        }

        let mut text = String::from("[");
        for _ in 0..len {
            if let Some(c) = self.advance() {
                text.push(c);
            }
        }
        self.advance();
        text.push(']');
        self.push(TokenKind::Relation, text, line, column);
        Ok(())
    }

    /// Line comment, block comment, or division
    fn scan_slash(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        if self.advance_if('/') {
            let mut text = String::from("//");
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                text.push(c);
                self.advance();
            }
            if self.options.preserve_comments {
                self.push(TokenKind::Comment, text, line, column);
            }
            return Ok(());
        }

        if self.advance_if('*') {
            let mut text = String::from("/*");
            loop {
                match self.advance() {
                    Some('*') if self.peek() == Some('/') => {
                        self.advance();
                        text.push_str("*/");
                        break;
                    }
                    Some(c) => text.push(c),
                    None => return Err(LexError::UnterminatedComment { line, column }),
                }
            }
            if self.options.preserve_comments {
                self.push(TokenKind::Comment, text, line, column);
            }
            return Ok(());
        }

        self.push(TokenKind::Slash, "/", line, column);
        Ok(())
    }

    /// `##n` sequence numbers, example markers, and generic directives
    fn scan_hash(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        if self.advance_if('#') {
            let digits = self.read_while(|c| c.is_ascii_digit());
            if digits.is_empty() {
                return Err(LexError::Malformed {
                    message: "Expected a sequence number after '##'".to_string(),
                    line,
                    column,
                });
            }
            self.push(TokenKind::Sequence, digits, line, column);
            return Ok(());
        }

        let name = self.read_while(|c| c.is_alphanumeric() || c == '_');
        if name.is_empty() {
            return Err(LexError::UnexpectedCharacter { ch: '#', line, column });
        }

        match name.as_str() {
            "example" if self.advance_if(':') => {
                self.push(TokenKind::Example, "#example:", line, column);
            }
            "example_pattern" if self.advance_if(':') => {
                self.push(TokenKind::ExamplePattern, "#example_pattern:", line, column);
            }
            _ => self.push(TokenKind::Directive, name, line, column),
        }
        Ok(())
    }

    /// `$$group` or `$id`
    fn scan_dollar(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        let kind = if self.advance_if('$') {
            TokenKind::GroupId
        } else {
            TokenKind::Id
        };
        let name = self.read_while(|c| c.is_alphanumeric() || c == '_');
        if name.is_empty() {
            return Err(LexError::Malformed {
                message: "Expected an identifier after '$'".to_string(),
                line,
                column,
            });
        }
        self.push(kind, name, line, column);
        Ok(())
    }

    /// `~~entropy` or `~temperature`
    fn scan_tilde(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        let kind = if self.advance_if('~') {
            TokenKind::Entropy
        } else {
            TokenKind::Temperature
        };
        let value = self.read_sigil_number(line, column)?;
        self.push(kind, value, line, column);
        Ok(())
    }

    /// Named `@` markers, falling back to a numeric confidence
    fn scan_at(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        if matches!(self.peek(), Some(c) if c.is_alphabetic()) {
            let word = self.read_while(|c| c.is_alphanumeric() || c == '_');
            let kind = match word.as_str() {
                "coherence" => TokenKind::Coherence,
                "version" => TokenKind::Version,
                "origin" => TokenKind::Origin,
                "citation" => TokenKind::Citation,
                _ => {
                    return Err(LexError::Malformed {
                        message: format!("Unknown marker '@{}'", &word),
                        line,
                        column,
                    })
                }
            };
            self.push(kind, format!("@{}", word), line, column);
            return Ok(());
        }

        let value = self.read_sigil_number(line, column)?;
        self.push(TokenKind::Confidence, value, line, column);
        Ok(())
    }

    fn scan_string(&mut self, line: usize, column: usize) -> Result<(), LexError> {
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(c) => value.push(c),
                    None => return Err(LexError::UnterminatedString { line, column }),
                },
                Some(c) => value.push(c),
                None => return Err(LexError::UnterminatedString { line, column }),
            }
        }
        self.push(TokenKind::String, value, line, column);
        Ok(())
    }

    fn read_word(&mut self, first: char) -> String {
        let mut word = String::from(first);
        word.push_str(&self.read_while(|c| c.is_alphanumeric() || c == '_'));
        word
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            text.push(c);
            self.advance();
        }
        text
    }

    fn read_sigil_number(&mut self, line: usize, column: usize) -> Result<String, LexError> {
        match self.advance() {
            Some(c) if c.is_ascii_digit() => self.read_number(c, line, column),
            _ => Err(LexError::Malformed {
                message: "Expected a number after sigil".to_string(),
                line,
                column,
            }),
        }
    }

    /// Read a number whose first digit has already been consumed
    fn read_number(&mut self, first: char, line: usize, column: usize) -> Result<String, LexError> {
        let mut text = String::from(first);
        text.push_str(&self.read_while(|c| c.is_ascii_digit()));

        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.advance();
            text.push('.');
            text.push_str(&self.read_while(|c| c.is_ascii_digit()));
        }

        if matches!(self.peek(), Some('e') | Some('E'))
            && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit() || c == '+' || c == '-')
        {
            if let Some(e) = self.advance() {
                text.push(e);
            }
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.advance();
                text.push(sign);
            }
            let exponent = self.read_while(|c| c.is_ascii_digit());
            text.push_str(&exponent);
            if exponent.is_empty() {
                return Err(LexError::InvalidNumber { text, line, column });
            }
        }

        if text.parse::<f64>().is_err() {
            return Err(LexError::InvalidNumber { text, line, column });
        }
        Ok(text)
    }
}
