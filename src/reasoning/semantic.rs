//! Seams for external semantic collaborators
//!
//! The engine does not know how ontologies or source trust work. It hands
//! the flattened list of asserted statements to a collaborator and folds the
//! typed answer back into its own reports.

use tracing::debug;

use super::engine::InferenceEngine;
use crate::ast::Statement;

/// Two statements an ontology considers incompatible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticFinding {
    pub left: Statement,
    pub right: Statement,
    pub reason: String,
}

/// Finds contradictions beyond structural negation
pub trait OntologyReasoner {
    fn find_contradictions(&self, statements: &[Statement]) -> Vec<SemanticFinding>;
}

/// A low-trust statement contradicting a high-trust one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustConflict {
    pub low_trust: Statement,
    pub high_trust: Statement,
    pub reason: String,
}

/// Flags statements from low-trust sources
pub trait TrustRegistry {
    fn find_conflicts(&self, statements: &[Statement]) -> Vec<TrustConflict>;
}

impl InferenceEngine {
    /// Ask a trust registry about the asserted statements
    pub fn trust_conflicts(&self, registry: &dyn TrustRegistry) -> Vec<TrustConflict> {
        let statements = self.statements();
        let conflicts = registry.find_conflicts(&statements);
        debug!(
            statements = statements.len(),
            conflicts = conflicts.len(),
            "trust registry consulted"
        );
        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, LogicalNode, Program};
    use crate::reasoning::ContradictionKind;

    /// Treats `IsA` statements about the same subject with different
    /// objects as disjoint
    struct DisjointTypes;

    impl OntologyReasoner for DisjointTypes {
        fn find_contradictions(&self, statements: &[Statement]) -> Vec<SemanticFinding> {
            let typed: Vec<&Statement> = statements
                .iter()
                .filter(|s| s.relation.name == "IsA")
                .collect();
            let mut findings = Vec::new();
            for (i, left) in typed.iter().enumerate() {
                for right in &typed[i + 1..] {
                    if left.subject == right.subject && left.object != right.object {
                        findings.push(SemanticFinding {
                            left: (*left).clone(),
                            right: (*right).clone(),
                            reason: "disjoint types".to_string(),
                        });
                    }
                }
            }
            findings
        }
    }

    /// Anything about `Rumor` is low trust and conflicts with everything else
    struct RumorRegistry;

    impl TrustRegistry for RumorRegistry {
        fn find_conflicts(&self, statements: &[Statement]) -> Vec<TrustConflict> {
            let (low, high): (Vec<&Statement>, Vec<&Statement>) = statements
                .iter()
                .partition(|s| s.subject == Expression::concept("Rumor"));
            low.iter()
                .flat_map(|l| {
                    high.iter().map(move |h| TrustConflict {
                        low_trust: (*l).clone(),
                        high_trust: (*h).clone(),
                        reason: "unverified source".to_string(),
                    })
                })
                .collect()
        }
    }

    fn engine() -> InferenceEngine {
        InferenceEngine::new(Program::new(vec![
            LogicalNode::fact(Statement::triple("Tom", "IsA", "Cat")),
            LogicalNode::fact(Statement::triple("Tom", "IsA", "Dog")),
            LogicalNode::fact(Statement::triple("Rumor", "Says", "Tom")),
        ]))
    }

    #[test]
    fn test_semantic_findings_are_merged() {
        let report = engine().check_semantic_consistency(&DisjointTypes);
        assert_eq!(report.count(ContradictionKind::Semantic), 1);
        assert_eq!(report.count(ContradictionKind::Direct), 0);
        assert_eq!(report.contradictions[0].reason, "disjoint types");
    }

    #[test]
    fn test_trust_conflicts() {
        let conflicts = engine().trust_conflicts(&RumorRegistry);
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts
            .iter()
            .all(|c| c.low_trust.subject == Expression::concept("Rumor")));
    }
}
