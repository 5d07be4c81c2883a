//! Pattern unification over AIQL nodes
//!
//! Unification compares a pattern node against a target node of the same
//! shape and produces a [`Substitution`] binding pattern variables to the
//! target's terms. There is no variable sigil at this layer: a term is a
//! pattern variable when its text is not bracket-delimited and starts with a
//! lowercase ASCII letter. Concepts and relations are compared by their
//! bracketed text, so `x` is a variable while `<x>` and `[is_a]` are
//! constants.
//!
//! Only the pattern side is inspected for variables; target terms are always
//! treated as constants.

use std::fmt;

use indexmap::IndexMap;

use crate::ast::{
    Expression, Intent, LogicalExpression, LogicalNode, QuantifiedExpression, Statement,
};

/// True when `text` names a pattern variable
pub fn is_pattern_variable(text: &str) -> bool {
    let bracketed = (text.starts_with('<') && text.ends_with('>'))
        || (text.starts_with('[') && text.ends_with(']'));
    !bracketed && text.starts_with(|c: char| c.is_ascii_lowercase())
}

/// Variable bindings in the order they were made
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    bindings: IndexMap<String, Expression>,
}

impl Substitution {
    /// Create an empty substitution
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variable
    pub fn get(&self, var: &str) -> Option<&Expression> {
        self.bindings.get(var)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expression)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Unify one pattern term against a target term
    fn unify_term(&mut self, pattern: &Expression, target: &Expression) -> bool {
        let pattern_text = pattern.term_text();
        let target_text = target.term_text();
        if !is_pattern_variable(&pattern_text) {
            return pattern_text == target_text;
        }
        match self.bindings.get(&pattern_text) {
            Some(bound) => bound.term_text() == target_text,
            None => {
                self.bindings.insert(pattern_text, target.clone());
                true
            }
        }
    }

    fn unify_statement(&mut self, pattern: &Statement, target: &Statement) -> bool {
        self.unify_term(&pattern.subject, &target.subject)
            && pattern.relation.term_text() == target.relation.term_text()
            && self.unify_term(&pattern.object, &target.object)
    }

    fn unify_node(&mut self, pattern: &LogicalNode, target: &LogicalNode) -> bool {
        match (pattern, target) {
            (LogicalNode::Intent(p), LogicalNode::Intent(t)) => {
                p.intent_type == t.intent_type
                    && p.statements.len() == t.statements.len()
                    && p
                        .statements
                        .iter()
                        .zip(&t.statements)
                        .all(|(ps, ts)| self.unify_statement(ps, ts))
            }
            (
                LogicalNode::Logical(LogicalExpression::Not(p)),
                LogicalNode::Logical(LogicalExpression::Not(t)),
            ) => self.unify_node(p, t),
            (
                LogicalNode::Logical(LogicalExpression::Binary {
                    operator: pop,
                    left: pl,
                    right: pr,
                }),
                LogicalNode::Logical(LogicalExpression::Binary {
                    operator: top,
                    left: tl,
                    right: tr,
                }),
            ) => pop == top && self.unify_node(pl, tl) && self.unify_node(pr, tr),
            (LogicalNode::Quantified(p), LogicalNode::Quantified(t)) => {
                p.quantifier == t.quantifier
                    && p.variable == t.variable
                    && p.domain == t.domain
                    && self.unify_node(&p.body, &t.body)
            }
            (p, t) => p == t,
        }
    }

    // ------------------------------------------------------------------------
    // Application
    // ------------------------------------------------------------------------

    /// Rewrite every bound variable term in `node`
    pub fn apply(&self, node: &LogicalNode) -> LogicalNode {
        match node {
            LogicalNode::Intent(intent) => LogicalNode::Intent(Intent {
                statements: intent
                    .statements
                    .iter()
                    .map(|s| self.apply_statement(s))
                    .collect(),
                ..intent.clone()
            }),
            LogicalNode::Logical(LogicalExpression::Not(child)) => {
                LogicalNode::not(self.apply(child))
            }
            LogicalNode::Logical(LogicalExpression::Binary {
                operator,
                left,
                right,
            }) => LogicalNode::binary(*operator, self.apply(left), self.apply(right)),
            LogicalNode::Quantified(q) => LogicalNode::Quantified(QuantifiedExpression {
                quantifier: q.quantifier,
                variable: q.variable.clone(),
                domain: q.domain.clone(),
                body: Box::new(self.apply(&q.body)),
            }),
            other => other.clone(),
        }
    }

    pub fn apply_statement(&self, statement: &Statement) -> Statement {
        Statement {
            subject: self.apply_expression(&statement.subject),
            relation: statement.relation.clone(),
            object: self.apply_expression(&statement.object),
            attributes: statement.attributes.clone(),
        }
    }

    fn apply_expression(&self, expr: &Expression) -> Expression {
        let text = expr.term_text();
        if !is_pattern_variable(&text) {
            return expr.clone();
        }
        match self.bindings.get(&text) {
            Some(bound) => bound.clone(),
            None => expr.clone(),
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (var, term)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", var, term)?;
        }
        f.write_str("}")
    }
}

/// Unify `pattern` against `target`, returning a fresh substitution
pub fn unify(pattern: &LogicalNode, target: &LogicalNode) -> Option<Substitution> {
    let mut subst = Substitution::new();
    if subst.unify_node(pattern, target) {
        Some(subst)
    } else {
        None
    }
}
