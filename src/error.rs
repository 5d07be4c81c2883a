//! Structured Error Handling for aiql
//!
//! Provides a unified error type with:
//! - Error codes for programmatic handling
//! - Structured error output (JSON-friendly)
//! - Context preservation through error chains
//! - Process exit code mapping for the command-line driver
//!
//! # Error Categories
//!
//! - Lexical errors (1xxx) - unterminated literals, oversized input, stray characters
//! - Parse errors (2xxx) - unexpected tokens, malformed nodes
//! - Reasoning errors (3xxx) - invalid engine configuration
//! - Config errors (7xxx) - configuration files and profiles
//! - I/O errors (8xxx) - reading sources, writing reports
//!
//! Unification failure, unproven goals and contradictions are not errors; the
//! reasoning engine reports them as ordinary values.
//!
//! # Example
//!
//! ```rust,ignore
//! use aiql::error::{AiqlError, ErrorCode};
//!
//! fn load(source: &str) -> Result<(), AiqlError> {
//!     if source.is_empty() {
//!         return Err(AiqlError::new(ErrorCode::EmptyInput, "No source given")
//!             .with_context("file", "rules.aiql"));
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::lexer::LexError;
use crate::parser::ParseError;

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lexical errors (1xxx)
    /// Generic lexical error
    LexError = 1000,
    /// String literal never closed
    UnterminatedString = 1001,
    /// Relation bracket never closed
    UnterminatedRelation = 1002,
    /// Block comment never closed
    UnterminatedComment = 1003,
    /// Input exceeds the lexer size cap
    InputTooLarge = 1004,
    /// Character that starts no token
    UnexpectedCharacter = 1005,
    /// Malformed numeric literal
    InvalidNumber = 1006,
    /// Sigil or marker without a valid body
    MalformedToken = 1007,

    // Parse errors (2xxx)
    /// Generic parse error
    ParseError = 2000,
    /// Token not allowed here
    UnexpectedToken = 2001,
    /// Unexpected end of input
    UnexpectedEof = 2002,
    /// Tense suffix not past/present/future
    UnknownTense = 2003,
    /// Structurally invalid node
    MalformedNode = 2004,

    // Reasoning errors (3xxx)
    /// Generic reasoning error
    ReasoningError = 3000,
    /// Engine limits out of range
    InvalidEngineConfig = 3001,

    // Validation errors (5xxx)
    /// Empty input
    EmptyInput = 5001,

    // Config errors (7xxx)
    /// Generic config error
    ConfigError = 7000,
    /// Config file not found
    ConfigNotFound = 7001,
    /// Invalid config syntax
    InvalidConfigSyntax = 7002,
    /// Unknown profile
    UnknownProfile = 7003,
    /// Invalid config value
    InvalidConfigValue = 7004,

    // I/O errors (8xxx)
    /// Generic I/O error
    IoError = 8000,
    /// Source file not found
    FileNotFound = 8001,
    /// File access denied
    FileAccessDenied = 8002,
    /// Malformed JSON
    InvalidFormat = 8003,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            // Lexical errors
            ErrorCode::LexError => "Lexical error",
            ErrorCode::UnterminatedString => "Unterminated string literal",
            ErrorCode::UnterminatedRelation => "Unterminated relation",
            ErrorCode::UnterminatedComment => "Unterminated block comment",
            ErrorCode::InputTooLarge => "Input too large",
            ErrorCode::UnexpectedCharacter => "Unexpected character",
            ErrorCode::InvalidNumber => "Invalid number",
            ErrorCode::MalformedToken => "Malformed token",

            // Parse errors
            ErrorCode::ParseError => "Parse error",
            ErrorCode::UnexpectedToken => "Unexpected token",
            ErrorCode::UnexpectedEof => "Unexpected end of input",
            ErrorCode::UnknownTense => "Unknown tense",
            ErrorCode::MalformedNode => "Malformed node",

            // Reasoning errors
            ErrorCode::ReasoningError => "Reasoning error",
            ErrorCode::InvalidEngineConfig => "Invalid engine configuration",

            ErrorCode::EmptyInput => "Empty input",

            // Config errors
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ConfigNotFound => "Configuration file not found",
            ErrorCode::InvalidConfigSyntax => "Invalid configuration syntax",
            ErrorCode::UnknownProfile => "Unknown profile",
            ErrorCode::InvalidConfigValue => "Invalid configuration value",

            // I/O errors
            ErrorCode::IoError => "I/O error",
            ErrorCode::FileNotFound => "File not found",
            ErrorCode::FileAccessDenied => "File access denied",
            ErrorCode::InvalidFormat => "Invalid format",

            ErrorCode::InternalError => "Internal error",
        }
    }

    /// Process exit status for this error (sysexits.h conventions)
    pub fn exit_status(&self) -> i32 {
        match self.code() / 1000 {
            // EX_DATAERR
            1 | 2 | 5 => 65,
            // EX_SOFTWARE
            3 | 9 => 70,
            // EX_IOERR
            8 => 74,
            // EX_CONFIG
            7 => 78,
            _ => 1,
        }
    }

    /// Whether the error stems from the source text rather than the environment
    pub fn is_input_error(&self) -> bool {
        matches!(self.code() / 1000, 1 | 2 | 5)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Error Context
// ============================================================================

/// Additional context information for an error
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Key-value pairs of context information
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
    /// Source location (file:line:column or line:column)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Stack of error causes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ErrorContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the context
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add source location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for aiql
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiqlError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// Hint for resolving the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl AiqlError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    /// Create a reasoning error
    pub fn reasoning(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ReasoningError, message)
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.fields.insert(key.into(), value.into());
        self
    }

    /// Add a cause to the error chain
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.causes.push(cause.into());
        self
    }

    /// Add source location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.location = Some(location.into());
        self
    }

    /// Prefix the source location with a file name
    pub fn in_file(mut self, file: impl fmt::Display) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.location = Some(match ctx.location.take() {
            Some(pos) => format!("{}:{}", file, pos),
            None => file.to_string(),
        });
        self
    }

    /// Add a hint for resolving the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Process exit status for this error
    pub fn exit_status(&self) -> i32 {
        self.code.exit_status()
    }

    /// Source location, if known
    pub fn location(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.location.as_deref())
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"INTERNAL_ERROR","message":"{}"}}"#, self.message)
        })
    }

    /// Convert to pretty JSON string
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }

    fn positioned(code: ErrorCode, message: String, line: usize, column: usize) -> Self {
        AiqlError::new(code, message)
            .with_context("line", line.to_string())
            .with_context("column", column.to_string())
            .at(format!("{}:{}", line, column))
    }
}

impl fmt::Display for AiqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;

        if let Some(ref ctx) = self.context {
            if let Some(ref loc) = ctx.location {
                write!(f, " at {}", loc)?;
            }
            if !ctx.causes.is_empty() {
                write!(f, "\nCaused by:")?;
                for cause in &ctx.causes {
                    write!(f, "\n  - {}", cause)?;
                }
            }
        }

        if let Some(ref hint) = self.hint {
            write!(f, "\nHint: {}", hint)?;
        }

        Ok(())
    }
}

impl std::error::Error for AiqlError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<LexError> for AiqlError {
    fn from(err: LexError) -> Self {
        let code = match &err {
            LexError::UnterminatedString { .. } => ErrorCode::UnterminatedString,
            LexError::UnterminatedRelation { .. } => ErrorCode::UnterminatedRelation,
            LexError::UnterminatedComment { .. } => ErrorCode::UnterminatedComment,
            LexError::InputTooLarge { .. } => ErrorCode::InputTooLarge,
            LexError::UnexpectedCharacter { .. } => ErrorCode::UnexpectedCharacter,
            LexError::InvalidNumber { .. } => ErrorCode::InvalidNumber,
            LexError::Malformed { .. } => ErrorCode::MalformedToken,
        };
        let message = err.to_string();

        match err {
            LexError::InputTooLarge { limit, .. } => AiqlError::new(code, message)
                .with_hint(format!(
                    "Raise lexer.max_input_bytes (currently {}) or split the input",
                    limit
                )),
            LexError::UnterminatedRelation { line, column } => {
                AiqlError::positioned(code, message, line, column)
                    .with_hint("Close the relation with ']' on the same statement")
            }
            other => match other.position() {
                Some((line, column)) => AiqlError::positioned(code, message, line, column),
                None => AiqlError::new(code, message),
            },
        }
    }
}

impl From<ParseError> for AiqlError {
    fn from(err: ParseError) -> Self {
        let code = match &err {
            ParseError::UnexpectedToken { .. } => ErrorCode::UnexpectedToken,
            ParseError::UnexpectedEof { .. } => ErrorCode::UnexpectedEof,
            ParseError::InvalidNumber { .. } => ErrorCode::InvalidNumber,
            ParseError::UnknownTense { .. } => ErrorCode::UnknownTense,
            ParseError::Malformed { .. } => ErrorCode::MalformedNode,
        };
        let (line, column) = err.position();
        let error = AiqlError::positioned(code, err.to_string(), line, column);

        match err {
            ParseError::UnknownTense { .. } => {
                error.with_hint("Valid tenses are past, present and future")
            }
            _ => error,
        }
    }
}

impl From<ConfigError> for AiqlError {
    fn from(err: ConfigError) -> Self {
        let code = match &err {
            ConfigError::IoError(..) => ErrorCode::ConfigNotFound,
            ConfigError::ParseError(..) => ErrorCode::InvalidConfigSyntax,
            ConfigError::SerializeError(_) => ErrorCode::ConfigError,
            ConfigError::UnknownProfile(_) => ErrorCode::UnknownProfile,
            ConfigError::InvalidValue(..) => ErrorCode::InvalidConfigValue,
        };
        let error = AiqlError::new(code, err.to_string());
        match err {
            ConfigError::UnknownProfile(_) => {
                error.with_hint("Built-in profiles: default, shallow, deep")
            }
            _ => error,
        }
    }
}

impl From<std::io::Error> for AiqlError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let code = match err.kind() {
            ErrorKind::NotFound => ErrorCode::FileNotFound,
            ErrorKind::PermissionDenied => ErrorCode::FileAccessDenied,
            _ => ErrorCode::IoError,
        };
        AiqlError::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for AiqlError {
    fn from(err: serde_json::Error) -> Self {
        AiqlError::new(ErrorCode::InvalidFormat, err.to_string()).with_context("format", "JSON")
    }
}

impl From<toml::de::Error> for AiqlError {
    fn from(err: toml::de::Error) -> Self {
        AiqlError::config(err.to_string()).with_code(ErrorCode::InvalidConfigSyntax)
    }
}

// ============================================================================
// Result type alias
// ============================================================================

/// A Result type using AiqlError
pub type AiqlResult<T> = Result<T, AiqlError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = AiqlError::reasoning("bad limits");
        assert_eq!(err.code, ErrorCode::ReasoningError);
        assert_eq!(err.message, "bad limits");
    }

    #[test]
    fn test_error_with_context() {
        let err = AiqlError::new(ErrorCode::ParseError, "syntax error")
            .with_context("line", "42")
            .with_context("column", "10");

        let ctx = err.context.as_ref().unwrap();
        assert_eq!(ctx.fields.get("line"), Some(&"42".to_string()));
        assert_eq!(ctx.fields.get("column"), Some(&"10".to_string()));
    }

    #[test]
    fn test_error_display() {
        let err = AiqlError::new(ErrorCode::ParseError, "syntax error")
            .at("3:7")
            .in_file("rules.aiql")
            .with_cause("unexpected token")
            .with_hint("Check your syntax");

        let display = err.to_string();
        assert!(display.contains("[2000]"));
        assert!(display.contains("syntax error"));
        assert!(display.contains("rules.aiql:3:7"));
        assert!(display.contains("unexpected token"));
        assert!(display.contains("Check your syntax"));
    }

    #[test]
    fn test_from_lex_error() {
        let err = AiqlError::from(LexError::UnterminatedString { line: 2, column: 5 });
        assert_eq!(err.code, ErrorCode::UnterminatedString);
        assert_eq!(err.location(), Some("2:5"));

        let err = AiqlError::from(LexError::InputTooLarge { size: 20, limit: 10 });
        assert_eq!(err.code, ErrorCode::InputTooLarge);
        assert!(err.location().is_none());
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_from_parse_error() {
        let err = AiqlError::from(ParseError::UnknownTense {
            tense: "someday".to_string(),
            line: 1,
            column: 5,
        });
        assert_eq!(err.code, ErrorCode::UnknownTense);
        assert!(err.message.contains("someday"));
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_from_config_error() {
        let err = AiqlError::from(ConfigError::UnknownProfile("turbo".to_string()));
        assert_eq!(err.code, ErrorCode::UnknownProfile);
        assert_eq!(err.exit_status(), 78);
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(ErrorCode::UnexpectedToken.exit_status(), 65);
        assert_eq!(ErrorCode::InputTooLarge.exit_status(), 65);
        assert_eq!(ErrorCode::FileNotFound.exit_status(), 74);
        assert_eq!(ErrorCode::InternalError.exit_status(), 70);
        assert!(ErrorCode::UnterminatedComment.is_input_error());
        assert!(!ErrorCode::ConfigError.is_input_error());
    }

    #[test]
    fn test_error_to_json() {
        let err = AiqlError::new(ErrorCode::UnexpectedEof, "ran out");
        let json = err.to_json();
        assert!(json.contains("UNEXPECTED_EOF"));
        assert!(json.contains("ran out"));
    }
}
