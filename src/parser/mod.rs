//! AIQL parser
//!
//! Recursive-descent parser over the token stream produced by
//! [`crate::lexer`]. One call parses one whole [`Program`]; any error aborts
//! the parse and no partial tree is returned.
//!
//! # Example
//!
//! ```ignore
//! use aiql::parser::parse;
//!
//! let program = parse("!Query { <Python> [is_a] <Language> } @0.9")?;
//! assert_eq!(program.body.len(), 1);
//! ```
//!
//! Connectives share one precedence level and associate to the left;
//! `then`/`therefore` read as `implies` and `A because B` reads as
//! `B implies A`. Arithmetic follows `^` > `* / %` > `+ -`.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::*;
use crate::error::AiqlResult;
use crate::lexer::{tokenize, Lexer, LexerOptions, Token, TokenKind};

/// Parser error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unexpected {found} at {line}:{column}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        line: usize,
        column: usize,
    },

    #[error("Unexpected end of input at {line}:{column}, expected {expected}")]
    UnexpectedEof {
        expected: String,
        line: usize,
        column: usize,
    },

    #[error("Invalid number '{text}' at {line}:{column}")]
    InvalidNumber {
        text: String,
        line: usize,
        column: usize,
    },

    #[error("Unknown tense '{tense}' at {line}:{column}")]
    UnknownTense {
        tense: String,
        line: usize,
        column: usize,
    },

    #[error("{message} at {line}:{column}")]
    Malformed {
        message: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    /// Source position of the error
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::UnexpectedToken { line, column, .. }
            | ParseError::UnexpectedEof { line, column, .. }
            | ParseError::InvalidNumber { line, column, .. }
            | ParseError::UnknownTense { line, column, .. }
            | ParseError::Malformed { line, column, .. } => (*line, *column),
        }
    }

    fn malformed(message: impl Into<String>, token: &Token) -> Self {
        ParseError::Malformed {
            message: message.into(),
            line: token.line,
            column: token.column,
        }
    }
}

/// Of two failed alternatives, keep the one that got further
fn furthest(a: ParseError, b: ParseError) -> ParseError {
    if b.position() > a.position() {
        b
    } else {
        a
    }
}

/// Parse source text into a program
pub fn parse(source: &str) -> AiqlResult<Program> {
    let tokens = tokenize(source)?;
    Ok(Parser::new(tokens).parse_program()?)
}

/// Parse source text with explicit lexer options
pub fn parse_with_options(source: &str, options: LexerOptions) -> AiqlResult<Program> {
    let tokens = Lexer::with_options(source, options).tokenize()?;
    Ok(Parser::new(tokens).parse_program()?)
}

/// Parse a standalone expression such as `10 - 5 - 2`
pub fn parse_expression(source: &str) -> AiqlResult<Expression> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression()?;
    parser.expect(TokenKind::Eof, "end of input")?;
    Ok(expr)
}

/// Deepest nesting of groups, negations and operator chains accepted
pub const MAX_NESTING: usize = 128;

/// Recursive-descent parser over a token vector
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Create a parser; comment tokens are dropped and a trailing `Eof` is
    /// guaranteed.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();
        if !tokens.last().map_or(false, Token::is_eof) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // ========================================================================
    // Token cursor
    // ========================================================================

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    // ========================================================================
    // Nesting
    // ========================================================================

    /// Run `parse` one level deeper, failing once [`MAX_NESTING`] is reached
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Height after folding one more operand into a left-associative chain
    fn fold_height(&self, height: usize, right: usize) -> Result<usize, ParseError> {
        let height = height.max(right) + 1;
        if self.depth + height > MAX_NESTING {
            return Err(self.too_deep());
        }
        Ok(height)
    }

    fn too_deep(&self) -> ParseError {
        ParseError::malformed(
            format!("Nesting deeper than {} levels", MAX_NESTING),
            self.peek(),
        )
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_symbol(&self, symbol: &str) -> bool {
        self.peek().is_symbol(symbol)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn advance_if_symbol(&mut self, symbol: &str) -> bool {
        if self.check_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        if token.is_eof() {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
                line: token.line,
                column: token.column,
            }
        } else {
            ParseError::UnexpectedToken {
                found: token.to_string(),
                expected: expected.to_string(),
                line: token.line,
                column: token.column,
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<Token, ParseError> {
        if self.check_symbol(symbol) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", symbol)))
        }
    }

    fn number_value(token: &Token) -> Result<Number, ParseError> {
        token
            .value
            .parse::<f64>()
            .map(Number::new)
            .map_err(|_| ParseError::InvalidNumber {
                text: token.value.clone(),
                line: token.line,
                column: token.column,
            })
    }

    // ========================================================================
    // Program and logical structure
    // ========================================================================

    /// Parse the whole token stream
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();

        while !self.peek().is_eof() {
            match self.peek().kind {
                TokenKind::Version | TokenKind::Origin | TokenKind::Citation => {
                    let marker = self.advance();
                    self.advance_if_symbol(":");
                    let value = self.expect(TokenKind::String, "provenance string")?.value;
                    match marker.kind {
                        TokenKind::Version => program.version = Some(value),
                        TokenKind::Origin => program.origin = Some(value),
                        _ => program.citation = Some(value),
                    }
                }
                TokenKind::Directive => {
                    let name = self.advance().value;
                    let params = if self.check_symbol("(") {
                        self.parse_pairs()?
                    } else {
                        BTreeMap::new()
                    };
                    program.directives.push(Directive { name, params });
                }
                TokenKind::Symbol if self.check_symbol(".") || self.check_symbol(";") => {
                    self.advance();
                }
                _ => {
                    let node = self.parse_logical()?;
                    program.body.push(node);
                }
            }
        }

        debug!(nodes = program.body.len(), "parsed program");
        Ok(program)
    }

    /// `unit (connective unit)*`, left-associative
    pub fn parse_logical(&mut self) -> Result<LogicalNode, ParseError> {
        let mut left = self.parse_unit()?;
        let mut height = left.depth();

        loop {
            let kind = self.peek().kind;
            if !kind.is_connective() {
                break;
            }
            self.advance();
            let right = self.parse_unit()?;
            height = self.fold_height(height, right.depth())?;
            left = match kind {
                TokenKind::And => LogicalNode::and(left, right),
                TokenKind::Or => LogicalNode::or(left, right),
                TokenKind::Iff => LogicalNode::iff(left, right),
                TokenKind::Because => LogicalNode::implies(right, left),
                _ => LogicalNode::implies(left, right),
            };
        }

        Ok(left)
    }

    fn parse_unit(&mut self) -> Result<LogicalNode, ParseError> {
        self.nested(Self::parse_unit_inner)
    }

    fn parse_unit_inner(&mut self) -> Result<LogicalNode, ParseError> {
        match self.peek().kind {
            TokenKind::Not => {
                self.advance();
                Ok(LogicalNode::not(self.parse_unit()?))
            }
            TokenKind::Forall | TokenKind::Exists => self.parse_quantified(),
            TokenKind::Intent => self.parse_intent(),
            TokenKind::Rule => self.parse_rule(),
            TokenKind::Relationship => self.parse_relationship(),
            TokenKind::Example | TokenKind::ExamplePattern => self.parse_example(),
            TokenKind::Symbol if self.check_symbol("(") => {
                let start = self.pos;
                match self.parse_group() {
                    Ok(node) => Ok(node),
                    Err(group_err) => {
                        // `(10 - 5) [p] x` opens a statement, not a group
                        self.pos = start;
                        self.parse_fact().map_err(|fact_err| furthest(group_err, fact_err))
                    }
                }
            }
            _ => self.parse_fact(),
        }
    }

    fn parse_group(&mut self) -> Result<LogicalNode, ParseError> {
        self.expect_symbol("(")?;
        let node = self.parse_logical()?;
        self.expect_symbol(")")?;
        Ok(node)
    }

    fn parse_quantified(&mut self) -> Result<LogicalNode, ParseError> {
        let quantifier = match self.advance().kind {
            TokenKind::Forall => Quantifier::Forall,
            _ => Quantifier::Exists,
        };
        let variable = self.expect(TokenKind::Identifier, "quantified variable")?.value;

        let domain = if self.check(TokenKind::In) {
            self.advance();
            match self.peek().kind {
                TokenKind::String | TokenKind::Concept | TokenKind::Identifier => {
                    Some(self.advance().value)
                }
                _ => return Err(self.unexpected("quantifier domain")),
            }
        } else {
            None
        };

        self.advance_if_symbol(":");
        let body = self.parse_logical()?;

        Ok(LogicalNode::Quantified(QuantifiedExpression {
            quantifier,
            variable,
            domain,
            body: Box::new(body),
        }))
    }

    // ========================================================================
    // Intents, statements and metadata
    // ========================================================================

    fn parse_intent(&mut self) -> Result<LogicalNode, ParseError> {
        let marker = self.advance();
        let mut intent = Intent::new(marker.value, Vec::new());

        if self.check_symbol("(") {
            intent.context = self.parse_pairs()?;
        }

        self.expect_symbol("{")?;
        while !self.check_symbol("}") {
            if self.peek().is_eof() {
                return Err(self.unexpected("'}'"));
            }
            intent.statements.push(self.parse_statement()?);
            if self.check_symbol(";") || self.check_symbol(",") || self.check_symbol(".") {
                self.advance();
            }
        }
        self.expect_symbol("}")?;

        self.parse_metadata(&mut intent)?;
        Ok(LogicalNode::Intent(intent))
    }

    /// A bare statement becomes an `assert` intent
    fn parse_fact(&mut self) -> Result<LogicalNode, ParseError> {
        let statement = self.parse_statement()?;
        let mut intent = Intent::assert(vec![statement]);
        self.parse_metadata(&mut intent)?;
        Ok(LogicalNode::Intent(intent))
    }

    fn parse_metadata(&mut self, intent: &mut Intent) -> Result<(), ParseError> {
        loop {
            match self.peek().kind {
                TokenKind::Confidence => {
                    let token = self.advance();
                    intent.confidence = Some(Self::number_value(&token)?);
                }
                TokenKind::Coherence => {
                    self.advance();
                    self.advance_if_symbol(":");
                    let token = self.expect(TokenKind::Number, "coherence value")?;
                    intent.coherence = Some(Self::number_value(&token)?);
                }
                TokenKind::Temperature => {
                    let token = self.advance();
                    intent.temperature = Some(Self::number_value(&token)?);
                }
                TokenKind::Entropy => {
                    let token = self.advance();
                    intent.entropy = Some(Self::number_value(&token)?);
                }
                // `$x [rel] ...` starts the next statement
                TokenKind::Id if self.peek_at(1).kind != TokenKind::Relation => {
                    intent.id = Some(self.advance().value);
                }
                TokenKind::GroupId => {
                    intent.group_id = Some(self.advance().value);
                }
                TokenKind::Sequence => {
                    let token = self.advance();
                    let sequence = token.value.parse::<u64>().map_err(|_| {
                        ParseError::InvalidNumber {
                            text: token.value.clone(),
                            line: token.line,
                            column: token.column,
                        }
                    })?;
                    intent.sequence = Some(sequence);
                }
                TokenKind::Directive if self.peek().value == "security" => {
                    self.advance();
                    intent.security = Some(self.parse_pairs()?);
                }
                _ => return Ok(()),
            }
        }
    }

    /// `( key: value, ... )` with scalar values kept as text
    fn parse_pairs(&mut self) -> Result<BTreeMap<String, String>, ParseError> {
        self.expect_symbol("(")?;
        let mut pairs = BTreeMap::new();

        while !self.check_symbol(")") {
            let key = self.peek().clone();
            let is_word = matches!(key.kind, TokenKind::Identifier | TokenKind::String)
                || TokenKind::keyword(&key.value).is_some();
            if !is_word {
                return Err(self.unexpected("parameter name"));
            }
            self.advance();
            self.expect_symbol(":")?;

            let value = match self.peek().kind {
                TokenKind::String
                | TokenKind::Number
                | TokenKind::Boolean
                | TokenKind::Identifier
                | TokenKind::Concept => self.advance().value,
                TokenKind::Id => format!("${}", self.advance().value),
                TokenKind::Minus if self.peek_at(1).kind == TokenKind::Number => {
                    self.advance();
                    format!("-{}", self.advance().value)
                }
                _ => return Err(self.unexpected("parameter value")),
            };
            pairs.insert(key.value, value);

            if !self.advance_if_symbol(",") {
                break;
            }
        }

        self.expect_symbol(")")?;
        Ok(pairs)
    }

    /// `subject [relation] object { key: expr, ... }?`
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let subject = self.parse_expression()?;
        let relation_token = self.expect(TokenKind::Relation, "relation")?;
        let relation = Self::relation_from(&relation_token)?;
        let object = self.parse_expression()?;
        let mut statement = Statement::new(subject, relation, object);

        if self.check_symbol("{") {
            self.advance();
            while !self.check_symbol("}") {
                let key = self.expect(TokenKind::Identifier, "attribute name")?.value;
                self.expect_symbol(":")?;
                let value = self.parse_expression()?;
                statement.attributes.insert(key, AttributeValue::from(value));
                if !self.advance_if_symbol(",") {
                    break;
                }
            }
            self.expect_symbol("}")?;
        }

        Ok(statement)
    }

    /// Split `[name:tense]` into a relation
    fn relation_from(token: &Token) -> Result<Relation, ParseError> {
        let inner = token
            .value
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(&token.value)
            .trim();

        let (name, tense) = match inner.split_once(':') {
            Some((name, tense)) => {
                let tense = tense.trim();
                let parsed = Tense::from_str(tense).ok_or_else(|| ParseError::UnknownTense {
                    tense: tense.to_string(),
                    line: token.line,
                    column: token.column,
                })?;
                (name.trim(), Some(parsed))
            }
            None => (inner, None),
        };

        if name.is_empty() {
            return Err(ParseError::malformed("Empty relation name", token));
        }

        Ok(Relation {
            name: name.to_string(),
            tense,
        })
    }

    // ========================================================================
    // Rules, relationships and examples
    // ========================================================================

    fn parse_rule(&mut self) -> Result<LogicalNode, ParseError> {
        self.advance();
        let name = match self.peek().kind {
            TokenKind::Identifier | TokenKind::String => self.advance().value,
            _ => return Err(self.unexpected("rule name")),
        };

        let bidirectional = if self.check(TokenKind::Bidirectional) {
            self.advance();
            true
        } else {
            false
        };

        self.expect_symbol("{")?;
        let premises = self.parse_logical()?;
        self.expect_symbol("}")?;
        self.expect(TokenKind::FatArrow, "'=>'")?;
        self.expect_symbol("{")?;
        let conclusion = self.parse_logical()?;
        self.expect_symbol("}")?;

        let mut rule = RuleDefinition::new(name, premises, conclusion);
        rule.bidirectional = bidirectional;
        if self.check(TokenKind::Confidence) {
            let token = self.advance();
            rule.confidence = Self::number_value(&token)?;
        }

        Ok(LogicalNode::Rule(rule))
    }

    fn parse_relationship(&mut self) -> Result<LogicalNode, ParseError> {
        self.advance();
        let source = self.expect(TokenKind::Id, "source id")?.value;
        let relation_token = self.expect(TokenKind::Relation, "relation")?;
        let relation = Self::relation_from(&relation_token)?;
        let target = self.expect(TokenKind::Id, "target id")?.value;

        let confidence = if self.check(TokenKind::Confidence) {
            let token = self.advance();
            Some(Self::number_value(&token)?)
        } else {
            None
        };

        Ok(LogicalNode::Relationship(RelationshipNode {
            source,
            relation,
            target,
            confidence,
        }))
    }

    fn parse_example(&mut self) -> Result<LogicalNode, ParseError> {
        let pattern = self.advance().kind == TokenKind::ExamplePattern;
        let name = match self.peek().kind {
            TokenKind::String | TokenKind::Identifier => self.advance().value,
            _ => return Err(self.unexpected("example name")),
        };

        self.expect_symbol("{")?;
        let mut body = Vec::new();
        while !self.check_symbol("}") {
            if self.peek().is_eof() {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_logical()?);
            if self.check_symbol(";") || self.check_symbol(".") {
                self.advance();
            }
        }
        self.expect_symbol("}")?;

        Ok(LogicalNode::Example(ExampleNode {
            name,
            pattern,
            body,
        }))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// `set (cmp set)?`
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_set()?;

        let op = match self.peek().kind {
            TokenKind::EqEq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::NotEq,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Lte => CompareOp::Lte,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Gte => CompareOp::Gte,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_set()?;

        Ok(Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_set(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        let mut height = left.depth();
        loop {
            let op = match self.peek().kind {
                TokenKind::Union => SetOp::Union,
                TokenKind::Intersect => SetOp::Intersect,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            height = self.fold_height(height, right.depth())?;
            left = Expression::Set {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        let mut height = left.depth();
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => MathOp::Add,
                TokenKind::Minus => MathOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            height = self.fold_height(height, right.depth())?;
            left = Expression::math(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_power()?;
        let mut height = left.depth();
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => MathOp::Mul,
                TokenKind::Slash => MathOp::Div,
                TokenKind::Percent => MathOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_power()?;
            height = self.fold_height(height, right.depth())?;
            left = Expression::math(op, left, right);
        }
    }

    fn parse_power(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        let mut height = left.depth();
        while self.check(TokenKind::Caret) {
            self.advance();
            let right = self.parse_unary()?;
            height = self.fold_height(height, right.depth())?;
            left = Expression::math(MathOp::Pow, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        self.nested(Self::parse_unary_inner)
    }

    fn parse_unary_inner(&mut self) -> Result<Expression, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expression::Literal(Literal::Number(Self::number_value(&token)?)))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expression::string(token.value))
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(Expression::boolean(token.value == "true"))
            }
            TokenKind::Concept => {
                self.advance();
                let name = token
                    .value
                    .strip_prefix('<')
                    .and_then(|s| s.strip_suffix('>'))
                    .unwrap_or(&token.value);
                Ok(Expression::concept(name))
            }
            TokenKind::Id => {
                self.advance();
                Ok(Expression::identifier(format!("${}", token.value)))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.check_symbol("(") {
                    self.advance();
                    let args = self.parse_args(")")?;
                    Ok(Expression::FunctionApplication {
                        name: token.value,
                        args,
                    })
                } else {
                    Ok(Expression::identifier(token.value))
                }
            }
            TokenKind::Symbol if token.value == "(" => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_symbol(")")?;
                Ok(expr)
            }
            TokenKind::Symbol if token.value == "[" => {
                self.advance();
                Ok(Expression::list(self.parse_args("]")?))
            }
            TokenKind::Lambda => self.parse_lambda(),
            TokenKind::Geo => self.parse_geo(),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Comma-separated expressions up to and including `close`
    fn parse_args(&mut self, close: &str) -> Result<Vec<Expression>, ParseError> {
        let mut args = Vec::new();
        if self.advance_if_symbol(close) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.advance_if_symbol(",") {
                break;
            }
        }
        self.expect_symbol(close)?;
        Ok(args)
    }

    fn parse_lambda(&mut self) -> Result<Expression, ParseError> {
        self.advance();
        self.expect_symbol("(")?;
        let mut params = Vec::new();
        while !self.check_symbol(")") {
            params.push(self.expect(TokenKind::Identifier, "lambda parameter")?.value);
            if !self.advance_if_symbol(",") {
                break;
            }
        }
        self.expect_symbol(")")?;
        self.expect(TokenKind::Arrow, "'->'")?;
        let body = self.parse_expression()?;

        Ok(Expression::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn parse_geo(&mut self) -> Result<Expression, ParseError> {
        self.advance();
        self.expect_symbol("(")?;

        let spatial = match self.peek().kind {
            TokenKind::Identifier => Spatial::Variable(self.advance().value),
            TokenKind::Id => Spatial::Variable(format!("${}", self.advance().value)),
            _ => {
                let lat = self.parse_signed_number()?;
                self.expect_symbol(",")?;
                let lon = self.parse_signed_number()?;
                Spatial::Point { lat, lon }
            }
        };

        self.expect_symbol(")")?;
        Ok(Expression::Spatial(spatial))
    }

    fn parse_signed_number(&mut self) -> Result<Number, ParseError> {
        let negative = self.check(TokenKind::Minus);
        if negative {
            self.advance();
        }
        let token = self.expect(TokenKind::Number, "number")?;
        let value = Self::number_value(&token)?.value();
        Ok(Number::new(if negative { -value } else { value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn parse_ok(source: &str) -> Program {
        parse(source).unwrap()
    }

    fn single(source: &str) -> LogicalNode {
        let program = parse_ok(source);
        assert_eq!(program.body.len(), 1, "expected one node in {:?}", source);
        program.body.into_iter().next().unwrap()
    }

    fn fact(s: &str, r: &str, o: &str) -> LogicalNode {
        LogicalNode::fact(Statement::triple(s, r, o))
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_ok("").is_empty());
        assert!(parse_ok("  // only a comment\n").is_empty());
    }

    #[test]
    fn test_bare_statement() {
        assert_eq!(single("<Python> [is_a] <Language>"), fact("Python", "is_a", "Language"));
    }

    #[test]
    fn test_intent_with_metadata() {
        let node = single(
            "!Query(limit: 5, mode: \"fast\") { <A> [p] <B>; <C> [q] <D> } \
             @0.9 @coherence: 0.8 ~0.7 ~~0.2 $q1 $$batch ##3 #security(level: high)",
        );
        let intent = match node {
            LogicalNode::Intent(intent) => intent,
            other => panic!("expected intent, got {:?}", other),
        };
        assert_eq!(intent.intent_type, "query");
        assert_eq!(intent.statements.len(), 2);
        assert_eq!(intent.context.get("limit").map(String::as_str), Some("5"));
        assert_eq!(intent.context.get("mode").map(String::as_str), Some("fast"));
        assert_eq!(intent.confidence, Some(Number::new(0.9)));
        assert_eq!(intent.coherence, Some(Number::new(0.8)));
        assert_eq!(intent.temperature, Some(Number::new(0.7)));
        assert_eq!(intent.entropy, Some(Number::new(0.2)));
        assert_eq!(intent.id.as_deref(), Some("q1"));
        assert_eq!(intent.group_id.as_deref(), Some("batch"));
        assert_eq!(intent.sequence, Some(3));
        let security = intent.security.unwrap();
        assert_eq!(security.get("level").map(String::as_str), Some("high"));
    }

    #[test]
    fn test_id_before_statement_is_subject() {
        let program = parse_ok("<A> [p] <B>\n$x [q] <C>");
        assert_eq!(program.body.len(), 2);
        match &program.body[1] {
            LogicalNode::Intent(intent) => {
                assert_eq!(intent.statements[0].subject, Expression::identifier("$x"));
            }
            other => panic!("expected intent, got {:?}", other),
        }
    }

    #[test]
    fn test_relation_tense() {
        match single("<A> [was:past] <B>") {
            LogicalNode::Intent(intent) => {
                let relation = &intent.statements[0].relation;
                assert_eq!(relation.name, "was");
                assert_eq!(relation.tense, Some(Tense::Past));
            }
            other => panic!("expected intent, got {:?}", other),
        }

        let err = parse("<A> [was:someday] <B>").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownTense);
    }

    #[test]
    fn test_connectives_left_associative() {
        let a = fact("A", "p", "B");
        let b = fact("C", "p", "D");
        let c = fact("E", "p", "F");
        assert_eq!(
            single("<A> [p] <B> and <C> [p] <D> or <E> [p] <F>"),
            LogicalNode::or(LogicalNode::and(a.clone(), b.clone()), c.clone())
        );
        assert_eq!(
            single("<A> [p] <B> then <C> [p] <D>"),
            LogicalNode::implies(a.clone(), b.clone())
        );
        assert_eq!(
            single("<A> [p] <B> because <C> [p] <D>"),
            LogicalNode::implies(b.clone(), a.clone())
        );
    }

    #[test]
    fn test_not_takes_one_unit() {
        let a = fact("A", "p", "B");
        let b = fact("C", "p", "D");
        assert_eq!(
            single("not <A> [p] <B> and <C> [p] <D>"),
            LogicalNode::and(LogicalNode::not(a.clone()), b.clone())
        );
        assert_eq!(
            single("not (<A> [p] <B> and <C> [p] <D>)"),
            LogicalNode::not(LogicalNode::and(a, b))
        );
    }

    #[test]
    fn test_quantifier_body_is_greedy() {
        let node = single("forall x in <Animals>: x [is] <Alive> and x [has] <Cells>");
        match node {
            LogicalNode::Quantified(q) => {
                assert_eq!(q.quantifier, Quantifier::Forall);
                assert_eq!(q.variable, "x");
                assert_eq!(q.domain.as_deref(), Some("<Animals>"));
                assert!(q.body.as_conjunction().is_some());
            }
            other => panic!("expected quantifier, got {:?}", other),
        }
        assert!(parse("forall : <A> [p] <B>").is_err());
    }

    #[test]
    fn test_paren_falls_back_to_statement() {
        match single("(10 - 5) [gives] 5") {
            LogicalNode::Intent(intent) => {
                assert_eq!(
                    intent.statements[0].subject,
                    Expression::math(MathOp::Sub, Expression::number(10.0), Expression::number(5.0))
                );
            }
            other => panic!("expected intent, got {:?}", other),
        }
    }

    #[test]
    fn test_subtraction_left_associative() {
        let expr = parse_expression("10 - 5 - 2").unwrap();
        assert_eq!(
            expr,
            Expression::math(
                MathOp::Sub,
                Expression::math(MathOp::Sub, Expression::number(10.0), Expression::number(5.0)),
                Expression::number(2.0),
            )
        );
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = parse_expression("1 + 2 * 3 ^ 2").unwrap();
        assert_eq!(
            expr,
            Expression::math(
                MathOp::Add,
                Expression::number(1.0),
                Expression::math(
                    MathOp::Mul,
                    Expression::number(2.0),
                    Expression::math(MathOp::Pow, Expression::number(3.0), Expression::number(2.0)),
                ),
            )
        );

        let expr = parse_expression("-2 ^ 2").unwrap();
        assert_eq!(
            expr,
            Expression::math(
                MathOp::Pow,
                Expression::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(Expression::number(2.0)),
                },
                Expression::number(2.0),
            )
        );

        assert_eq!(
            parse_expression("10 / 2").unwrap(),
            Expression::math(MathOp::Div, Expression::number(10.0), Expression::number(2.0))
        );
    }

    #[test]
    fn test_comparison_and_sets() {
        let expr = parse_expression("a union b intersect c < 3").unwrap();
        match expr {
            Expression::Comparison { op, left, .. } => {
                assert_eq!(op, CompareOp::Lt);
                assert!(matches!(*left, Expression::Set { op: SetOp::Intersect, .. }));
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_primaries() {
        assert_eq!(
            parse_expression("[<A>, \"b\", 3]").unwrap(),
            Expression::list(vec![
                Expression::concept("A"),
                Expression::string("b"),
                Expression::number(3.0),
            ])
        );
        assert_eq!(
            parse_expression("max(x, 2)").unwrap(),
            Expression::FunctionApplication {
                name: "max".to_string(),
                args: vec![Expression::identifier("x"), Expression::number(2.0)],
            }
        );
        assert_eq!(
            parse_expression("geo(51.5, -0.12)").unwrap(),
            Expression::Spatial(Spatial::Point {
                lat: Number::new(51.5),
                lon: Number::new(-0.12),
            })
        );
        assert_eq!(
            parse_expression("geo(home)").unwrap(),
            Expression::Spatial(Spatial::Variable("home".to_string()))
        );
        match parse_expression("lambda(x, y) -> x + y").unwrap() {
            Expression::Lambda { params, .. } => assert_eq!(params, vec!["x", "y"]),
            other => panic!("expected lambda, got {:?}", other),
        }
    }

    #[test]
    fn test_statement_attributes() {
        match single("<Job> [runs] <Daily> { at: 9, enabled: true, window: x > 2 }") {
            LogicalNode::Intent(intent) => {
                let attrs = &intent.statements[0].attributes;
                assert_eq!(
                    attrs.get("at"),
                    Some(&AttributeValue::Literal(Literal::Number(Number::new(9.0))))
                );
                assert_eq!(
                    attrs.get("enabled"),
                    Some(&AttributeValue::Literal(Literal::Boolean(true)))
                );
                assert!(matches!(
                    attrs.get("window"),
                    Some(AttributeValue::Expression(Expression::Comparison { .. }))
                ));
            }
            other => panic!("expected intent, got {:?}", other),
        }
    }

    #[test]
    fn test_rule_definition() {
        let node = single(
            "rule Mortality bidirectional { x [is_a] <Human> } => { x [is] <Mortal> } @0.95",
        );
        match node {
            LogicalNode::Rule(rule) => {
                assert_eq!(rule.name, "Mortality");
                assert!(rule.bidirectional);
                assert_eq!(rule.confidence, Number::new(0.95));
            }
            other => panic!("expected rule, got {:?}", other),
        }

        match single("rule Plain { <A> [p] <B> } => { <C> [q] <D> }") {
            LogicalNode::Rule(rule) => {
                assert!(!rule.bidirectional);
                assert_eq!(rule.confidence, Number::new(1.0));
            }
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[test]
    fn test_relationship_and_example() {
        match single("relationship $a [supports] $b @0.6") {
            LogicalNode::Relationship(rel) => {
                assert_eq!(rel.source, "a");
                assert_eq!(rel.relation.name, "supports");
                assert_eq!(rel.target, "b");
                assert_eq!(rel.confidence, Some(Number::new(0.6)));
            }
            other => panic!("expected relationship, got {:?}", other),
        }

        match single("#example_pattern: \"lookup\" { <A> [p] <B> <C> [p] <D> }") {
            LogicalNode::Example(example) => {
                assert!(example.pattern);
                assert_eq!(example.name, "lookup");
                assert_eq!(example.body.len(), 2);
            }
            other => panic!("expected example, got {:?}", other),
        }
    }

    #[test]
    fn test_provenance_and_directives() {
        let program = parse_ok(
            "@version: \"1.2\" @origin \"lab\" @citation: \"doi\"\n#strict(level: 2)\n<A> [p] <B>.",
        );
        assert_eq!(program.version.as_deref(), Some("1.2"));
        assert_eq!(program.origin.as_deref(), Some("lab"));
        assert_eq!(program.citation.as_deref(), Some("doi"));
        assert_eq!(program.directives.len(), 1);
        assert_eq!(program.directives[0].name, "strict");
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_display_reparses() {
        let source = "!Task(owner: \"ops\") { <Db> [needs:future] <Backup> { at: 2 } } @0.8 \
                      rule R { x [is_a] <Dog> } => { x [is_a] <Animal> } \
                      forall x in <Dogs>: x [barks] <Loud> \
                      not (<A> [p] <B> iff <C> [q] <D>)";
        let program = parse_ok(source);
        let reparsed = parse_ok(&program.to_string());
        assert_eq!(program, reparsed);
    }

    #[test]
    fn test_errors_carry_positions() {
        let err = Parser::new(tokenize("<A> [p]").unwrap())
            .parse_program()
            .unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));

        let err = Parser::new(tokenize("<A>\n  <B> <C>").unwrap())
            .parse_program()
            .unwrap_err();
        assert_eq!(err.position(), (2, 3));

        let err = parse("!Query { <A> [p] <B>").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedEof);
    }

    #[test]
    fn test_deep_negation_is_rejected() {
        let source = format!("{}<A> [p] <B>", "not ".repeat(200_000));
        let err = parse(&source).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedNode);

        let source = format!("{}<A> [p] <B>", "not ".repeat(50));
        assert_eq!(single(&source).depth(), 53);
    }

    #[test]
    fn test_deep_grouping_is_rejected() {
        let source = format!("{}<A> [p] <B>{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(parse(&source).unwrap_err().code, ErrorCode::MalformedNode);

        let source = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            parse_expression(&source).unwrap_err().code,
            ErrorCode::MalformedNode
        );
        let source = format!("{}1{}", "[".repeat(10_000), "]".repeat(10_000));
        assert!(parse_expression(&source).is_err());

        let source = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(parse_expression(&source).unwrap(), Expression::number(1.0));
    }

    #[test]
    fn test_long_chains_are_bounded() {
        let facts = vec!["<A> [p] <B>"; 1_000].join(" and ");
        assert_eq!(parse(&facts).unwrap_err().code, ErrorCode::MalformedNode);

        let facts = vec!["<A> [p] <B>"; 100].join(" and ");
        assert_eq!(single(&facts).depth(), 102);

        let sum = vec!["1"; 1_000].join(" - ");
        assert_eq!(parse_expression(&sum).unwrap_err().code, ErrorCode::MalformedNode);
        let product = vec!["2"; 1_000].join(" * ");
        assert!(parse_expression(&product).is_err());

        let sum = vec!["1"; 100].join(" - ");
        assert_eq!(parse_expression(&sum).unwrap().depth(), 100);
    }

    #[test]
    fn test_lex_errors_propagate() {
        let err = parse("<A> [p] \"open").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnterminatedString);
    }
}
