//! Backward chaining
//!
//! Implements top-down, goal-directed proof search:
//! 1. A goal already in the knowledge base is proved outright
//! 2. Otherwise try each rule whose conclusion unifies with the goal and
//!    prove its substituted premises
//! 3. Otherwise decompose: `A and B` needs both sides, `A implies B` needs
//!    `B` under the temporary assumption `A`
//!
//! Search is bounded by the configured depth cap and a per-query visited set,
//! so an underivable goal fails instead of looping.

use std::ops::{Deref, DerefMut};

use fnv::FnvHashSet;
use tracing::{debug, trace};

use super::engine::InferenceEngine;
use super::proof::{
    Proof, ProofResult, ProofStep, CONJUNCTION_INTRODUCTION, IMPLICATION_INTRODUCTION, KNOWN_FACT,
};
use super::unify::unify;
use crate::ast::LogicalNode;

/// Holds a speculative fact in the knowledge base for its lifetime
///
/// Dropping the guard truncates the knowledge base back to its length before
/// the assumption, on every exit path.
pub struct AssumptionGuard<'a> {
    engine: &'a mut InferenceEngine,
    mark: usize,
}

impl<'a> AssumptionGuard<'a> {
    pub fn assume(engine: &'a mut InferenceEngine, node: LogicalNode) -> Self {
        let mark = engine.knowledge_base.len();
        engine.knowledge_base.insert(node);
        AssumptionGuard { engine, mark }
    }
}

impl Deref for AssumptionGuard<'_> {
    type Target = InferenceEngine;

    fn deref(&self) -> &InferenceEngine {
        self.engine
    }
}

impl DerefMut for AssumptionGuard<'_> {
    fn deref_mut(&mut self) -> &mut InferenceEngine {
        self.engine
    }
}

impl Drop for AssumptionGuard<'_> {
    fn drop(&mut self) {
        self.engine.knowledge_base.truncate(self.mark);
    }
}

struct Search {
    visited: FnvHashSet<LogicalNode>,
    steps: Vec<ProofStep>,
}

impl InferenceEngine {
    /// Try to prove `goal` from the knowledge base and rules
    pub fn backward_chain(&mut self, goal: &LogicalNode) -> ProofResult {
        self.stats.proofs_attempted += 1;
        let mut search = Search {
            visited: FnvHashSet::default(),
            steps: Vec::new(),
        };

        if self.prove(goal, 0, &mut search) {
            debug!(goal = %goal, steps = search.steps.len(), "goal proved");
            ProofResult::Proved(Proof {
                goal: goal.clone(),
                steps: search.steps,
            })
        } else {
            debug!(goal = %goal, explored = search.visited.len(), "goal not proved");
            ProofResult::NotProved {
                reason: format!("goal not derivable: {}", goal),
            }
        }
    }

    fn prove(&mut self, goal: &LogicalNode, depth: usize, search: &mut Search) -> bool {
        if self.knowledge_base.contains(goal) {
            search.steps.push(ProofStep::new(goal.clone(), KNOWN_FACT, depth));
            return true;
        }
        if depth >= self.config.max_depth {
            trace!(depth, goal = %goal, "depth cap reached");
            return false;
        }
        if !search.visited.insert(goal.clone()) {
            trace!(goal = %goal, "subgoal already visited");
            return false;
        }

        let mark = search.steps.len();

        let candidates: Vec<_> = self
            .rules
            .iter()
            .filter_map(|rule| {
                unify(&rule.conclusion, goal)
                    .map(|subst| (rule.name.clone(), subst.apply(&rule.premises), subst))
            })
            .collect();

        for (name, premises, subst) in candidates {
            trace!(rule = %name, depth, "trying rule");
            if self.prove(&premises, depth + 1, search) {
                search.steps.push(
                    ProofStep::new(goal.clone(), name, depth)
                        .with_premises(vec![premises])
                        .with_substitution(subst),
                );
                return true;
            }
            search.steps.truncate(mark);
        }

        if let Some((left, right)) = goal.as_conjunction() {
            let (left, right) = (left.clone(), right.clone());
            if self.prove(&left, depth + 1, search) && self.prove(&right, depth + 1, search) {
                search.steps.push(
                    ProofStep::new(goal.clone(), CONJUNCTION_INTRODUCTION, depth)
                        .with_premises(vec![left, right]),
                );
                return true;
            }
            search.steps.truncate(mark);
        }

        if let Some((antecedent, consequent)) = goal.as_implication() {
            let (antecedent, consequent) = (antecedent.clone(), consequent.clone());
            let proved = {
                let mut assumed = AssumptionGuard::assume(self, antecedent.clone());
                assumed.prove(&consequent, depth + 1, search)
            };
            if proved {
                search.steps.push(
                    ProofStep::new(goal.clone(), IMPLICATION_INTRODUCTION, depth)
                        .with_premises(vec![antecedent, consequent]),
                );
                return true;
            }
            search.steps.truncate(mark);
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, Program, RuleDefinition, Statement};
    use crate::reasoning::EngineConfig;

    fn fact(s: &str, r: &str, o: &str) -> LogicalNode {
        LogicalNode::fact(Statement::triple(s, r, o))
    }

    fn mortality() -> LogicalNode {
        LogicalNode::Rule(RuleDefinition::new(
            "mortality",
            fact("x", "IsA", "Human"),
            fact("x", "IsA", "Mortal"),
        ))
    }

    #[test]
    fn test_known_fact() {
        let a = fact("A", "P", "B");
        let mut engine = InferenceEngine::new(Program::new(vec![a.clone()]));
        let proof = engine.backward_chain(&a);
        let proof = proof.proof().unwrap();
        assert_eq!(proof.steps.len(), 1);
        assert_eq!(proof.steps[0].rule, KNOWN_FACT);
    }

    #[test]
    fn test_rule_proof() {
        let mut engine = InferenceEngine::new(Program::new(vec![
            mortality(),
            fact("Socrates", "IsA", "Human"),
        ]));
        let goal = fact("Socrates", "IsA", "Mortal");

        let result = engine.backward_chain(&goal);
        let proof = result.proof().unwrap();
        assert_eq!(proof.rules_used(), vec![KNOWN_FACT, "mortality"]);
        let last = proof.steps.last().unwrap();
        assert_eq!(last.conclusion, goal);
        assert_eq!(last.substitution.get("x"), Some(&Expression::concept("Socrates")));
        // Proving does not add facts
        assert!(!engine.contains(&goal));
    }

    #[test]
    fn test_conjunction_goal() {
        let a = fact("A", "P", "B");
        let b = fact("C", "Q", "D");
        let mut engine = InferenceEngine::new(Program::new(vec![a.clone(), b.clone()]));

        let result = engine.backward_chain(&LogicalNode::and(a.clone(), b.clone()));
        let proof = result.proof().unwrap();
        assert_eq!(proof.steps.len(), 3);
        assert_eq!(proof.steps[2].rule, CONJUNCTION_INTRODUCTION);
        assert_eq!(proof.steps[2].premises, vec![a.clone(), fact("C", "Q", "D")]);

        let missing = LogicalNode::and(a, fact("E", "R", "F"));
        assert!(!engine.backward_chain(&missing).is_proved());
    }

    #[test]
    fn test_implication_goal_restores_knowledge_base() {
        let a = fact("A", "P", "B");
        let b = fact("C", "Q", "D");
        let mut engine = InferenceEngine::new(Program::new(vec![b.clone()]));
        let len = engine.len();

        let result = engine.backward_chain(&LogicalNode::implies(a.clone(), b));
        assert!(result.is_proved());
        assert_eq!(engine.len(), len);
        assert!(!engine.contains(&a));

        let unprovable = LogicalNode::implies(a.clone(), fact("E", "R", "F"));
        assert!(!engine.backward_chain(&unprovable).is_proved());
        assert_eq!(engine.len(), len);
        assert!(!engine.contains(&a));
    }

    #[test]
    fn test_assumption_used_in_proof() {
        let a = fact("A", "P", "B");
        let mut engine = InferenceEngine::default();
        let result = engine.backward_chain(&LogicalNode::implies(a.clone(), a.clone()));
        let proof = result.proof().unwrap();
        assert_eq!(proof.steps[0].rule, KNOWN_FACT);
        assert_eq!(proof.steps[1].rule, IMPLICATION_INTRODUCTION);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_unrelated_goal_fails() {
        let mut engine = InferenceEngine::new(Program::new(vec![
            mortality(),
            fact("Socrates", "IsA", "Human"),
        ]));
        let result = engine.backward_chain(&fact("Unrelated", "P", "Thing"));
        match result {
            ProofResult::NotProved { reason } => assert!(reason.contains("<Unrelated>")),
            ProofResult::Proved(_) => panic!("unrelated goal proved"),
        }
    }

    #[test]
    fn test_cyclic_rules_terminate() {
        let loop_rule = LogicalNode::Rule(RuleDefinition::new(
            "loop",
            fact("x", "P", "B"),
            fact("x", "P", "B"),
        ));
        let mut engine = InferenceEngine::new(Program::new(vec![loop_rule]));
        assert!(!engine.backward_chain(&fact("A", "P", "B")).is_proved());
    }

    #[test]
    fn test_depth_cap() {
        // Each rule step needs one more level than the cap allows
        let chain = LogicalNode::Rule(RuleDefinition::new("step", fact("x", "Q", "B"), fact("x", "P", "B")));
        let config = EngineConfig {
            max_depth: 1,
            ..Default::default()
        };
        let nested = LogicalNode::Rule(RuleDefinition::new("deeper", fact("x", "R", "B"), fact("x", "Q", "B")));
        let mut engine = InferenceEngine::with_config(
            Program::new(vec![chain, nested, fact("A", "R", "B")]),
            config,
        )
        .unwrap();
        assert!(!engine.backward_chain(&fact("A", "P", "B")).is_proved());

        engine.config.max_depth = 5;
        assert!(engine.backward_chain(&fact("A", "P", "B")).is_proved());
    }
}
