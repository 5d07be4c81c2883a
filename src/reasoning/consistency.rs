//! Consistency checking for the knowledge base
//!
//! # Supported Checks
//!
//! - **Direct contradictions**: a fact `A` alongside `not A`
//! - **Contradictory implications**: `A implies B` alongside `A implies not B`
//! - **Semantic contradictions**: whatever an [`OntologyReasoner`] reports
//!   over the asserted statements
//!
//! Findings are data. An empty report means the knowledge base is
//! consistent.
//!
//! # Example
//!
//! ```ignore
//! use aiql::reasoning::InferenceEngine;
//!
//! let report = engine.check_consistency();
//! if !report.is_consistent() {
//!     for contradiction in &report.contradictions {
//!         println!("{}", contradiction);
//!     }
//! }
//! ```

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::engine::InferenceEngine;
use super::semantic::OntologyReasoner;
use crate::ast::LogicalNode;

/// Kind of contradiction found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionKind {
    Direct,
    Implication,
    Semantic,
}

impl ContradictionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContradictionKind::Direct => "direct",
            ContradictionKind::Implication => "implication",
            ContradictionKind::Semantic => "semantic",
        }
    }
}

/// A pair of nodes that cannot both hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contradiction {
    pub kind: ContradictionKind,
    pub left: LogicalNode,
    pub right: LogicalNode,
    pub reason: String,
}

impl fmt::Display for Contradiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} conflicts with {}: {}",
            self.kind.as_str(),
            self.left,
            self.right,
            self.reason
        )
    }
}

/// Result of a consistency check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub contradictions: Vec<Contradiction>,
    /// Knowledge base size at the time of the check
    pub facts_checked: usize,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.contradictions.is_empty()
    }

    pub fn count(&self, kind: ContradictionKind) -> usize {
        self.contradictions.iter().filter(|c| c.kind == kind).count()
    }
}

impl InferenceEngine {
    /// Scan the knowledge base for structural contradictions
    pub fn check_consistency(&self) -> ConsistencyReport {
        let kb = &self.knowledge_base;
        let mut contradictions = Vec::new();

        for node in kb {
            if let Some(inner) = node.as_negation() {
                if kb.contains(inner) {
                    contradictions.push(Contradiction {
                        kind: ContradictionKind::Direct,
                        left: inner.clone(),
                        right: node.clone(),
                        reason: format!("both {} and its negation are asserted", inner),
                    });
                }
            }
        }

        let implications: Vec<(&LogicalNode, &LogicalNode)> =
            kb.iter().filter_map(LogicalNode::as_implication).collect();
        for (i, (a1, b1)) in implications.iter().enumerate() {
            for (a2, b2) in &implications[i + 1..] {
                if a1 != a2 {
                    continue;
                }
                let negates = b2.as_negation() == Some(*b1) || b1.as_negation() == Some(*b2);
                if negates {
                    contradictions.push(Contradiction {
                        kind: ContradictionKind::Implication,
                        left: LogicalNode::implies((*a1).clone(), (*b1).clone()),
                        right: LogicalNode::implies((*a2).clone(), (*b2).clone()),
                        reason: format!("{} implies both {} and {}", a1, b1, b2),
                    });
                }
            }
        }

        debug!(
            facts = kb.len(),
            contradictions = contradictions.len(),
            "consistency check"
        );

        ConsistencyReport {
            contradictions,
            facts_checked: kb.len(),
        }
    }

    /// Structural check plus the ontology reasoner's findings
    pub fn check_semantic_consistency(&self, ontology: &dyn OntologyReasoner) -> ConsistencyReport {
        let mut report = self.check_consistency();
        let statements = self.statements();

        for finding in ontology.find_contradictions(&statements) {
            report.contradictions.push(Contradiction {
                kind: ContradictionKind::Semantic,
                left: LogicalNode::fact(finding.left),
                right: LogicalNode::fact(finding.right),
                reason: finding.reason,
            });
        }

        report
    }
}
