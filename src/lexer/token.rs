//! Token definitions for the AIQL lexer

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    // Intents and bracketed terms
    /// `!Name` intent marker (value is the name)
    Intent,
    /// `<Name>` concept (value keeps the brackets)
    Concept,
    /// `[name]` relation (value keeps the brackets)
    Relation,

    // Metadata sigils
    /// `@0.9`
    Confidence,
    /// `@coherence`
    Coherence,
    /// `~0.7`
    Temperature,
    /// `~~0.2`
    Entropy,
    /// `##3`
    Sequence,
    /// `$$group`
    GroupId,
    /// `$id`
    Id,
    /// `@version`
    Version,
    /// `@origin`
    Origin,
    /// `@citation`
    Citation,
    /// `#example:`
    Example,
    /// `#example_pattern:`
    ExamplePattern,
    /// `#name` generic directive
    Directive,

    // Keywords
    And,
    Or,
    Not,
    Implies,
    Iff,
    Then,
    Therefore,
    Because,
    Forall,
    Exists,
    In,
    Rule,
    Bidirectional,
    Relationship,
    Lambda,
    Geo,
    Union,
    Intersect,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    EqEq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Assign,
    /// `->`
    Arrow,
    /// `=>`
    FatArrow,

    // Primitives
    String,
    Number,
    Boolean,
    Identifier,
    /// Punctuation and list brackets
    Symbol,

    Comment,
    Eof,
}

impl TokenKind {
    /// Map a bare word to its keyword kind, if it is one
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "implies" => TokenKind::Implies,
            "iff" => TokenKind::Iff,
            "then" => TokenKind::Then,
            "therefore" => TokenKind::Therefore,
            "because" => TokenKind::Because,
            "forall" => TokenKind::Forall,
            "exists" => TokenKind::Exists,
            "in" => TokenKind::In,
            "rule" => TokenKind::Rule,
            "bidirectional" => TokenKind::Bidirectional,
            "relationship" => TokenKind::Relationship,
            "lambda" => TokenKind::Lambda,
            "geo" => TokenKind::Geo,
            "union" => TokenKind::Union,
            "intersect" => TokenKind::Intersect,
            "true" | "false" => TokenKind::Boolean,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether this kind joins two logical units
    pub fn is_connective(&self) -> bool {
        matches!(
            self,
            TokenKind::And
                | TokenKind::Or
                | TokenKind::Implies
                | TokenKind::Iff
                | TokenKind::Then
                | TokenKind::Therefore
                | TokenKind::Because
        )
    }

    /// Whether this kind is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Lte
                | TokenKind::Gt
                | TokenKind::Gte
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A lexed token with its 1-based source position
///
/// `value` is the payload the parser reads: a string without its quotes and
/// escapes resolved, a number without its `@`/`~` sigil, an intent name
/// without `!`. `lexeme` is the exact source text the token was read from;
/// lexing it again yields the same single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    #[serde(default)]
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    /// A token whose source text equals its value
    pub fn new(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        let value = value.into();
        Token {
            kind,
            lexeme: value.clone(),
            value,
            line,
            column,
        }
    }

    /// Check for a punctuation symbol with the given text
    pub fn is_symbol(&self, text: &str) -> bool {
        self.kind == TokenKind::Symbol && self.value == text
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TokenKind::Eof {
            write!(f, "end of input")
        } else {
            write!(f, "{} '{}'", self.kind, self.lexeme)
        }
    }
}
