//! Forward chaining
//!
//! Implements bottom-up, data-driven inference:
//! 1. Match every rule's premises against every known fact and add the novel
//!    conclusions
//! 2. Apply the structural inference rules over the knowledge base as it now
//!    stands and add their novel conclusions
//! 3. Repeat until a round adds nothing
//!
//! Structural rules applied each round:
//! - Modus ponens: `A`, `A implies B` gives `B`
//! - Modus tollens: `not B`, `A implies B` gives `not A`
//! - Hypothetical syllogism: `A implies B`, `B implies C` gives `A implies C`
//! - Disjunctive syllogism: `A or B`, `not A` gives `B` (and symmetrically)
//! - Conjunction introduction over the first few propositional facts
//! - Conjunction elimination: `A and B` gives `A` and `B`
//!
//! Disjunction introduction is left out since it never reaches a fixed point.

use fnv::FnvHashMap;
use tracing::{debug, trace};

use super::engine::InferenceEngine;
use super::unify::unify;
use crate::ast::LogicalNode;

/// A candidate conclusion and the rule that produced it
type Derivation = (LogicalNode, &'static str);

impl InferenceEngine {
    /// Run up to `max_steps` rounds and return the facts added, in order
    pub fn forward_chain(&mut self, max_steps: usize) -> Vec<LogicalNode> {
        let start = self.knowledge_base.len();
        self.stats.converged = false;

        for round in 1..=max_steps {
            let before = self.knowledge_base.len();

            let from_rules = self.apply_rule_definitions();
            self.commit(from_rules);
            let structural = self.apply_structural_rules();
            self.commit(structural);

            let added = self.knowledge_base.len() - before;
            self.stats.rounds += 1;
            self.stats.facts_derived += added;
            debug!(round, added, total = self.knowledge_base.len(), "forward chaining round");

            if added == 0 {
                self.stats.converged = true;
                break;
            }
        }

        self.knowledge_base.iter().skip(start).cloned().collect()
    }

    fn commit(&mut self, derived: Vec<Derivation>) {
        for (node, rule) in derived {
            if !self.knowledge_base.contains(&node) {
                trace!(rule, fact = %node, "derived");
                self.add_fact(node);
            }
        }
    }

    fn apply_rule_definitions(&mut self) -> Vec<Derivation> {
        let mut derived = Vec::new();
        let mut fired = 0;

        for rule in &self.rules {
            for fact in &self.knowledge_base {
                if let Some(subst) = unify(&rule.premises, fact) {
                    derived.push((subst.apply(&rule.conclusion), "rule"));
                    fired += 1;
                }
                if rule.bidirectional {
                    if let Some(subst) = unify(&rule.conclusion, fact) {
                        derived.push((subst.apply(&rule.premises), "rule_reverse"));
                        fired += 1;
                    }
                }
            }
        }

        self.stats.rules_fired += fired;
        derived
    }

    fn apply_structural_rules(&self) -> Vec<Derivation> {
        let kb = &self.knowledge_base;
        let mut derived = Vec::new();

        let implications: Vec<(&LogicalNode, &LogicalNode)> =
            kb.iter().filter_map(LogicalNode::as_implication).collect();

        let mut by_antecedent: FnvHashMap<&LogicalNode, Vec<&LogicalNode>> = FnvHashMap::default();
        for (a, b) in &implications {
            by_antecedent.entry(*a).or_default().push(*b);
        }

        for (a, b) in &implications {
            if kb.contains(*a) {
                derived.push(((*b).clone(), "modus_ponens"));
            }

            let not_b = LogicalNode::not((*b).clone());
            if kb.contains(&not_b) {
                derived.push((LogicalNode::not((*a).clone()), "modus_tollens"));
            }

            if let Some(consequents) = by_antecedent.get(*b) {
                for c in consequents {
                    derived.push((
                        LogicalNode::implies((*a).clone(), (*c).clone()),
                        "hypothetical_syllogism",
                    ));
                }
            }
        }

        for (a, b) in kb.iter().filter_map(LogicalNode::as_disjunction) {
            if kb.contains(&LogicalNode::not(a.clone())) {
                derived.push((b.clone(), "disjunctive_syllogism"));
            }
            if kb.contains(&LogicalNode::not(b.clone())) {
                derived.push((a.clone(), "disjunctive_syllogism"));
            }
        }

        let leading: Vec<&LogicalNode> = kb
            .iter()
            .filter(|node| node.is_propositional())
            .take(self.config.conjunction_cap)
            .collect();
        for (i, left) in leading.iter().enumerate() {
            for right in &leading[i + 1..] {
                derived.push((
                    LogicalNode::and((*left).clone(), (*right).clone()),
                    "conjunction_introduction",
                ));
            }
        }

        for (a, b) in kb.iter().filter_map(LogicalNode::as_conjunction) {
            derived.push((a.clone(), "conjunction_elimination"));
            derived.push((b.clone(), "conjunction_elimination"));
        }

        derived
    }
}
