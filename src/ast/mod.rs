//! AIQL abstract syntax tree
//!
//! This module defines the node types produced by the parser and consumed by
//! the reasoning engine:
//! - Programs (an ordered list of top-level logical nodes plus provenance)
//! - Intents (goal-tagged lists of statements with metadata)
//! - Statements (subject/relation/object triples)
//! - Logical connectives and quantifiers over nested nodes
//! - Rule definitions, relationships and examples
//!
//! Every node is an immutable value: equality and hashing are structural, so
//! whole trees can be deduplicated in a set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod display;
mod expression;

pub use expression::{
    CompareOp, Expression, Literal, MathOp, Number, SetOp, Spatial, UnaryOp, LIST_FUNCTION,
};

/// Intent type given to bare top-level statements
pub const ASSERT_INTENT: &str = "assert";

/// Root of a parsed source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<LogicalNode>,
    pub version: Option<String>,
    pub origin: Option<String>,
    pub citation: Option<String>,
    /// Generic `#name(...)` directives seen at top level
    pub directives: Vec<Directive>,
}

impl Program {
    pub fn new(body: Vec<LogicalNode>) -> Self {
        Program {
            body,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// A top-level `#name(key: value, ...)` directive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Directive {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

/// A node that can stand as a fact, premise or conclusion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalNode {
    Intent(Intent),
    Logical(LogicalExpression),
    Quantified(QuantifiedExpression),
    Rule(RuleDefinition),
    Relationship(RelationshipNode),
    Example(ExampleNode),
}

impl LogicalNode {
    /// A bare statement, wrapped in an `assert` intent
    pub fn fact(statement: Statement) -> Self {
        LogicalNode::Intent(Intent::assert(vec![statement]))
    }

    pub fn not(child: LogicalNode) -> Self {
        LogicalNode::Logical(LogicalExpression::Not(Box::new(child)))
    }

    pub fn binary(operator: Connective, left: LogicalNode, right: LogicalNode) -> Self {
        LogicalNode::Logical(LogicalExpression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn and(left: LogicalNode, right: LogicalNode) -> Self {
        Self::binary(Connective::And, left, right)
    }

    pub fn or(left: LogicalNode, right: LogicalNode) -> Self {
        Self::binary(Connective::Or, left, right)
    }

    pub fn implies(left: LogicalNode, right: LogicalNode) -> Self {
        Self::binary(Connective::Implies, left, right)
    }

    pub fn iff(left: LogicalNode, right: LogicalNode) -> Self {
        Self::binary(Connective::Iff, left, right)
    }

    /// Operands of a binary connective with the given operator
    pub fn as_binary(&self, operator: Connective) -> Option<(&LogicalNode, &LogicalNode)> {
        match self {
            LogicalNode::Logical(LogicalExpression::Binary {
                operator: op,
                left,
                right,
            }) if *op == operator => Some((left, right)),
            _ => None,
        }
    }

    pub fn as_implication(&self) -> Option<(&LogicalNode, &LogicalNode)> {
        self.as_binary(Connective::Implies)
    }

    pub fn as_conjunction(&self) -> Option<(&LogicalNode, &LogicalNode)> {
        self.as_binary(Connective::And)
    }

    pub fn as_disjunction(&self) -> Option<(&LogicalNode, &LogicalNode)> {
        self.as_binary(Connective::Or)
    }

    /// The operand of a `not` node
    pub fn as_negation(&self) -> Option<&LogicalNode> {
        match self {
            LogicalNode::Logical(LogicalExpression::Not(child)) => Some(child),
            _ => None,
        }
    }

    /// Height of the node tree, counting statements and their expressions
    pub fn depth(&self) -> usize {
        let deepest = |nodes: &[LogicalNode]| nodes.iter().map(LogicalNode::depth).max().unwrap_or(0);
        match self {
            LogicalNode::Intent(intent) => {
                1 + intent.statements.iter().map(Statement::depth).max().unwrap_or(0)
            }
            LogicalNode::Logical(LogicalExpression::Not(child)) => 1 + child.depth(),
            LogicalNode::Logical(LogicalExpression::Binary { left, right, .. }) => {
                1 + left.depth().max(right.depth())
            }
            LogicalNode::Quantified(q) => 1 + q.body.depth(),
            LogicalNode::Rule(rule) => 1 + rule.premises.depth().max(rule.conclusion.depth()),
            LogicalNode::Relationship(_) => 1,
            LogicalNode::Example(example) => 1 + deepest(&example.body),
        }
    }

    /// Intents, connectives and quantified formulas take part in inference;
    /// rules, relationships and examples are carried along unchanged.
    pub fn is_propositional(&self) -> bool {
        matches!(
            self,
            LogicalNode::Intent(_) | LogicalNode::Logical(_) | LogicalNode::Quantified(_)
        )
    }
}

impl From<Intent> for LogicalNode {
    fn from(intent: Intent) -> Self {
        LogicalNode::Intent(intent)
    }
}

/// A goal-tagged container of statements
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Intent {
    /// Lower-cased tag such as `query`, `assert` or `task`
    pub intent_type: String,
    pub statements: Vec<Statement>,
    pub confidence: Option<Number>,
    pub coherence: Option<Number>,
    pub temperature: Option<Number>,
    pub entropy: Option<Number>,
    pub id: Option<String>,
    pub group_id: Option<String>,
    pub sequence: Option<u64>,
    pub context: BTreeMap<String, String>,
    /// Opaque security metadata from `#security(...)`
    pub security: Option<BTreeMap<String, String>>,
}

impl Intent {
    pub fn new(intent_type: impl Into<String>, statements: Vec<Statement>) -> Self {
        Intent {
            intent_type: intent_type.into().to_lowercase(),
            statements,
            ..Default::default()
        }
    }

    pub fn assert(statements: Vec<Statement>) -> Self {
        Self::new(ASSERT_INTENT, statements)
    }

    /// True when nothing besides the type and statements is set
    pub fn is_plain(&self) -> bool {
        self.confidence.is_none()
            && self.coherence.is_none()
            && self.temperature.is_none()
            && self.entropy.is_none()
            && self.id.is_none()
            && self.group_id.is_none()
            && self.sequence.is_none()
            && self.context.is_empty()
            && self.security.is_none()
    }
}

/// Subject, relation, object triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Expression,
    pub relation: Relation,
    pub object: Expression,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Statement {
    pub fn new(subject: Expression, relation: Relation, object: Expression) -> Self {
        Statement {
            subject,
            relation,
            object,
            attributes: BTreeMap::new(),
        }
    }

    /// Height of the statement, counting its subject, object and attributes
    pub fn depth(&self) -> usize {
        let attributes = self.attributes.values().map(|value| match value {
            AttributeValue::Literal(_) => 1,
            AttributeValue::Expression(expr) => expr.depth(),
        });
        1 + attributes
            .chain([self.subject.depth(), self.object.depth()])
            .max()
            .unwrap_or(0)
    }

    /// Shorthand statement; see [`Expression::term`] for how names are read
    pub fn triple(subject: &str, relation: &str, object: &str) -> Self {
        Self::new(
            Expression::term(subject),
            Relation::new(relation),
            Expression::term(object),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub tense: Option<Tense>,
}

impl Relation {
    pub fn new(name: impl Into<String>) -> Self {
        Relation {
            name: name.into(),
            tense: None,
        }
    }

    /// `name` or `name:tense`, without brackets
    pub fn label(&self) -> String {
        match self.tense {
            Some(tense) => format!("{}:{}", self.name, tense.as_str()),
            None => self.name.clone(),
        }
    }

    /// Text a relation is matched by during unification
    pub fn term_text(&self) -> String {
        format!("[{}]", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tense {
    Past,
    Present,
    Future,
}

impl Tense {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "past" => Some(Tense::Past),
            "present" => Some(Tense::Present),
            "future" => Some(Tense::Future),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tense::Past => "past",
            Tense::Present => "present",
            Tense::Future => "future",
        }
    }
}

/// Value of a statement attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeValue {
    Literal(Literal),
    Expression(Expression),
}

impl From<Expression> for AttributeValue {
    fn from(expr: Expression) -> Self {
        match expr {
            Expression::Literal(lit) => AttributeValue::Literal(lit),
            other => AttributeValue::Expression(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
    And,
    Or,
    Implies,
    Iff,
}

impl Connective {
    pub fn keyword(&self) -> &'static str {
        match self {
            Connective::And => "and",
            Connective::Or => "or",
            Connective::Implies => "implies",
            Connective::Iff => "iff",
        }
    }
}

/// Propositional connective over nested nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalExpression {
    Not(Box<LogicalNode>),
    Binary {
        operator: Connective,
        left: Box<LogicalNode>,
        right: Box<LogicalNode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantifier {
    Forall,
    Exists,
}

impl Quantifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Quantifier::Forall => "forall",
            Quantifier::Exists => "exists",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantifiedExpression {
    pub quantifier: Quantifier,
    pub variable: String,
    /// Domain text as written: a concept keeps its brackets
    pub domain: Option<String>,
    pub body: Box<LogicalNode>,
}

/// Named inference rule `premises => conclusion`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    pub premises: Box<LogicalNode>,
    pub conclusion: Box<LogicalNode>,
    pub bidirectional: bool,
    pub confidence: Number,
}

impl RuleDefinition {
    pub fn new(name: impl Into<String>, premises: LogicalNode, conclusion: LogicalNode) -> Self {
        RuleDefinition {
            name: name.into(),
            premises: Box::new(premises),
            conclusion: Box::new(conclusion),
            bidirectional: false,
            confidence: Number::new(1.0),
        }
    }
}

/// Link between two statement ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipNode {
    pub source: String,
    pub relation: Relation,
    pub target: String,
    pub confidence: Option<Number>,
}

/// A named example block
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExampleNode {
    pub name: String,
    /// Declared with `#example_pattern:`
    pub pattern: bool,
    pub body: Vec<LogicalNode>,
}
