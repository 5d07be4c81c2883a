//! Expression nodes: the subjects, objects and attribute values of statements

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A floating-point value with structural equality
///
/// Equality and hashing use the bit pattern, with `-0.0` folded into `0.0` and
/// every NaN folded into one canonical NaN, so expression trees can live in hash
/// sets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Number(f64);

impl Number {
    pub fn new(value: f64) -> Self {
        Number(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    fn canonical_bits(self) -> u64 {
        if self.0 == 0.0 {
            0.0f64.to_bits()
        } else if self.0.is_nan() {
            f64::NAN.to_bits()
        } else {
            self.0.to_bits()
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_bits() == other.canonical_bits()
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_bits().hash(state);
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number(value)
    }
}

/// Scalar literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Literal {
    String(String),
    Number(Number),
    Boolean(bool),
}

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl MathOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            MathOp::Add => "+",
            MathOp::Sub => "-",
            MathOp::Mul => "*",
            MathOp::Div => "/",
            MathOp::Mod => "%",
            MathOp::Pow => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetOp {
    Union,
    Intersect,
}

impl SetOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            SetOp::Union => "union",
            SetOp::Intersect => "intersect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    /// Arithmetic negation `-x`
    Neg,
    /// Logical negation `not x`
    Not,
}

/// Relational operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// Location reference inside `geo(...)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spatial {
    Point { lat: Number, lon: Number },
    Variable(String),
}

/// An expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// Named entity, stored without its angle brackets
    Concept(String),
    Literal(Literal),
    /// Bare name, bound or free
    Identifier(String),
    Math {
        op: MathOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Set {
        op: SetOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Named function call; list literals are the function `list`
    FunctionApplication { name: String, args: Vec<Expression> },
    Lambda {
        params: Vec<String>,
        body: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Comparison {
        op: CompareOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Spatial(Spatial),
}

/// Function name used for list literals
pub const LIST_FUNCTION: &str = "list";

impl Expression {
    pub fn concept(name: impl Into<String>) -> Self {
        Expression::Concept(name.into())
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn number(value: f64) -> Self {
        Expression::Literal(Literal::Number(Number::new(value)))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Boolean(value))
    }

    pub fn math(op: MathOp, left: Expression, right: Expression) -> Self {
        Expression::Math {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn list(items: Vec<Expression>) -> Self {
        Expression::FunctionApplication {
            name: LIST_FUNCTION.to_string(),
            args: items,
        }
    }

    /// Text a term is matched by during unification
    ///
    /// Identifiers yield their bare name; everything else, concepts included,
    /// yields its surface rendering.
    pub fn term_text(&self) -> String {
        match self {
            Expression::Identifier(name) => name.clone(),
            other => other.to_string(),
        }
    }

    /// A concept for capitalised names, an identifier otherwise
    ///
    /// `term("x")` is the pattern variable `x`, `term("Human")` is `<Human>`.
    pub fn term(name: &str) -> Self {
        if name.starts_with(|c: char| c.is_ascii_lowercase()) {
            Expression::identifier(name)
        } else {
            Expression::concept(name)
        }
    }

    /// Height of the expression tree; leaves count as one
    pub fn depth(&self) -> usize {
        match self {
            Expression::Concept(_)
            | Expression::Literal(_)
            | Expression::Identifier(_)
            | Expression::Spatial(_) => 1,
            Expression::Math { left, right, .. }
            | Expression::Set { left, right, .. }
            | Expression::Comparison { left, right, .. } => 1 + left.depth().max(right.depth()),
            Expression::FunctionApplication { args, .. } => {
                1 + args.iter().map(Expression::depth).max().unwrap_or(0)
            }
            Expression::Lambda { body: inner, .. } | Expression::Unary { operand: inner, .. } => {
                1 + inner.depth()
            }
        }
    }

    /// Numeric value, if this is a number literal
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expression::Literal(Literal::Number(n)) => Some(n.value()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_number_equality() {
        assert_eq!(Number::new(0.0), Number::new(-0.0));
        assert_eq!(Number::new(f64::NAN), Number::new(f64::NAN));
        assert_ne!(Number::new(1.0), Number::new(1.5));

        let mut set = HashSet::new();
        set.insert(Expression::number(0.0));
        assert!(set.contains(&Expression::number(-0.0)));
    }

    #[test]
    fn test_term_text() {
        assert_eq!(Expression::concept("Python").term_text(), "<Python>");
        assert_eq!(Expression::concept("x").term_text(), "<x>");
        assert_eq!(Expression::identifier("x").term_text(), "x");
        assert_eq!(Expression::number(3.0).term_text(), "3");
        assert_eq!(Expression::string("hi").term_text(), "\"hi\"");
        assert_eq!(
            Expression::list(vec![Expression::concept("A")]).term_text(),
            "[<A>]"
        );
    }

    #[test]
    fn test_depth() {
        assert_eq!(Expression::number(1.0).depth(), 1);
        let sum = Expression::math(MathOp::Sub, Expression::number(1.0), Expression::number(2.0));
        assert_eq!(sum.depth(), 2);
        assert_eq!(Expression::list(vec![sum, Expression::number(3.0)]).depth(), 3);
        assert_eq!(Expression::list(vec![]).depth(), 1);
    }

    #[test]
    fn test_term_builder() {
        assert_eq!(Expression::term("x"), Expression::identifier("x"));
        assert_eq!(Expression::term("Human"), Expression::concept("Human"));
    }
}
