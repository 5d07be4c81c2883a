//! AIQL - agent intent language
//!
//! A front-end and logic engine for AIQL, a small language for expressing
//! agent intents, statements, logical formulas and inference rules.
//!
//! # Architecture
//!
//! Source text flows through a fixed pipeline:
//!
//! - [`lexer`] - Context-sensitive tokenizer (concepts vs `<`, relations vs lists)
//! - [`parser`] - Recursive-descent parser producing one [`ast::Program`]
//! - [`reasoning`] - Knowledge base with unification, forward and backward
//!   chaining, and consistency checking
//!
//! Supporting modules:
//!
//! - [`config`] - TOML configuration with profiles and environment overrides
//! - [`error`] - Crate-wide error type with stable numeric codes
//!
//! # Example
//!
//! ```rust,ignore
//! use aiql::{parse, InferenceEngine};
//!
//! let program = parse(r#"
//!     rule mortality { x [IsA] <Human> } => { x [IsA] <Mortal> }
//!     <Socrates> [IsA] <Human>
//! "#)?;
//!
//! let mut engine = InferenceEngine::new(program);
//! let derived = engine.forward_chain(10);
//!
//! let goal = parse("<Socrates> [IsA] <Mortal>")?.body.remove(0);
//! assert!(engine.backward_chain(&goal).is_proved());
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod reasoning;

// Re-export the AST
pub use crate::ast::{
    Expression, Intent, LogicalExpression, LogicalNode, Program, QuantifiedExpression, Relation,
    RuleDefinition, Statement,
};

// Re-export the pipeline entry points
pub use crate::config::{AiqlConfig, ConfigError};
pub use crate::error::{AiqlError, AiqlResult, ErrorCode};
pub use crate::lexer::{tokenize, LexError, Lexer, LexerOptions, Token, TokenKind};
pub use crate::parser::{parse, parse_expression, ParseError, Parser};
pub use crate::reasoning::{
    unify, ConsistencyReport, Contradiction, EngineConfig, InferenceEngine, Proof,
    ProofFormatter, ProofResult, ProofStep, Substitution,
};
