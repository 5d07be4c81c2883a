//! Proofs produced by backward chaining
//!
//! A [`Proof`] is the ordered list of steps, leaves first, that established
//! a goal. Each step records the conclusion, the rule that justified it, the
//! premises it relied on and the substitution used, if any.
//!
//! # Usage
//!
//! ```ignore
//! use aiql::reasoning::{InferenceEngine, ProofFormatter, ProofResult};
//!
//! if let ProofResult::Proved(proof) = engine.backward_chain(&goal) {
//!     println!("{}", ProofFormatter::new(&proof).to_text());
//! }
//! ```

use std::fmt::Write;

use serde_json::{json, Value};

use super::unify::Substitution;
use crate::ast::LogicalNode;

/// Justification for a goal already present in the knowledge base
pub const KNOWN_FACT: &str = "known_fact";
/// Justification for `A and B` from proofs of both sides
pub const CONJUNCTION_INTRODUCTION: &str = "conjunction_introduction";
/// Justification for `A implies B` from a proof of `B` assuming `A`
pub const IMPLICATION_INTRODUCTION: &str = "implication_introduction";

/// A single inference in a proof
#[derive(Debug, Clone, PartialEq)]
pub struct ProofStep {
    pub conclusion: LogicalNode,
    /// Rule definition name, or one of the structural justifications
    pub rule: String,
    pub premises: Vec<LogicalNode>,
    pub substitution: Substitution,
    /// Nesting depth of the subgoal this step closed
    pub depth: usize,
}

impl ProofStep {
    pub fn new(conclusion: LogicalNode, rule: impl Into<String>, depth: usize) -> Self {
        ProofStep {
            conclusion,
            rule: rule.into(),
            premises: Vec::new(),
            substitution: Substitution::new(),
            depth,
        }
    }

    pub fn with_premises(mut self, premises: Vec<LogicalNode>) -> Self {
        self.premises = premises;
        self
    }

    pub fn with_substitution(mut self, substitution: Substitution) -> Self {
        self.substitution = substitution;
        self
    }
}

/// Ordered proof of a goal
#[derive(Debug, Clone, PartialEq)]
pub struct Proof {
    pub goal: LogicalNode,
    pub steps: Vec<ProofStep>,
}

impl Proof {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Distinct rule names cited, in first-use order
    pub fn rules_used(&self) -> Vec<&str> {
        let mut rules: Vec<&str> = Vec::new();
        for step in &self.steps {
            if !rules.contains(&step.rule.as_str()) {
                rules.push(&step.rule);
            }
        }
        rules
    }
}

/// Outcome of a backward-chaining query
#[derive(Debug, Clone, PartialEq)]
pub enum ProofResult {
    Proved(Proof),
    NotProved { reason: String },
}

impl ProofResult {
    pub fn is_proved(&self) -> bool {
        matches!(self, ProofResult::Proved(_))
    }

    pub fn proof(&self) -> Option<&Proof> {
        match self {
            ProofResult::Proved(proof) => Some(proof),
            ProofResult::NotProved { .. } => None,
        }
    }
}

/// Formatter for proof output
pub struct ProofFormatter<'a> {
    proof: &'a Proof,
    indent: usize,
}

impl<'a> ProofFormatter<'a> {
    pub fn new(proof: &'a Proof) -> Self {
        ProofFormatter { proof, indent: 2 }
    }

    /// Spaces per nesting level in text output
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Format the proof as indented text, deepest subgoals indented most
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Proof of {}", self.proof.goal);

        for (i, step) in self.proof.steps.iter().enumerate() {
            let pad = " ".repeat(self.indent * (step.depth + 1));
            let _ = write!(output, "{}{}. {}  [{}]", pad, i + 1, step.conclusion, step.rule);
            if !step.substitution.is_empty() {
                let _ = write!(output, " with {}", step.substitution);
            }
            output.push('\n');
            for premise in &step.premises {
                let _ = writeln!(output, "{}   from {}", pad, premise);
            }
        }

        output
    }

    /// Format the proof as a JSON value
    pub fn to_value(&self) -> Value {
        let steps: Vec<Value> = self
            .proof
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let bindings: serde_json::Map<String, Value> = step
                    .substitution
                    .iter()
                    .map(|(var, term)| (var.to_string(), Value::String(term.to_string())))
                    .collect();
                json!({
                    "step": i + 1,
                    "depth": step.depth,
                    "rule": step.rule,
                    "conclusion": step.conclusion.to_string(),
                    "premises": step.premises.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
                    "bindings": bindings,
                })
            })
            .collect();

        json!({
            "type": "Proof",
            "goal": self.proof.goal.to_string(),
            "steps": steps,
        })
    }

    /// Format the proof as pretty-printed JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;

    fn sample() -> Proof {
        let leaf = LogicalNode::fact(Statement::triple("Socrates", "IsA", "Human"));
        let goal = LogicalNode::fact(Statement::triple("Socrates", "IsA", "Mortal"));
        Proof {
            goal: goal.clone(),
            steps: vec![
                ProofStep::new(leaf.clone(), KNOWN_FACT, 1),
                ProofStep::new(goal, "mortality", 0).with_premises(vec![leaf]),
            ],
        }
    }

    #[test]
    fn test_rules_used() {
        let proof = sample();
        assert_eq!(proof.rules_used(), vec![KNOWN_FACT, "mortality"]);
        assert_eq!(proof.len(), 2);
    }

    #[test]
    fn test_text_format() {
        let text = ProofFormatter::new(&sample()).to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Proof of <Socrates> [IsA] <Mortal>");
        assert_eq!(lines[1], "    1. <Socrates> [IsA] <Human>  [known_fact]");
        assert_eq!(lines[2], "  2. <Socrates> [IsA] <Mortal>  [mortality]");
        assert_eq!(lines[3], "     from <Socrates> [IsA] <Human>");
    }

    #[test]
    fn test_json_format() {
        let value = ProofFormatter::new(&sample()).to_value();
        assert_eq!(value["goal"], "<Socrates> [IsA] <Mortal>");
        assert_eq!(value["steps"][1]["rule"], "mortality");
        assert_eq!(value["steps"][0]["depth"], 1);
        assert!(ProofFormatter::new(&sample()).to_json().contains("\"type\": \"Proof\""));
    }

    #[test]
    fn test_proof_result_accessors() {
        let proved = ProofResult::Proved(sample());
        assert!(proved.is_proved());
        assert!(proved.proof().is_some());

        let failed = ProofResult::NotProved {
            reason: "goal not derivable".to_string(),
        };
        assert!(!failed.is_proved());
        assert!(failed.proof().is_none());
    }
}
