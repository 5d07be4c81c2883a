//! Knowledge base and inference engine state

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{LogicalNode, Program, RuleDefinition, Statement};
use crate::error::{AiqlError, AiqlResult, ErrorCode};
use crate::parser::parse;

/// Limits applied by the inference engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Backward-chaining depth cap
    pub max_depth: usize,
    /// Number of leading propositional facts paired by conjunction introduction
    pub conjunction_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_depth: 20,
            conjunction_cap: 10,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> AiqlResult<()> {
        if self.max_depth == 0 {
            return Err(AiqlError::new(
                ErrorCode::InvalidEngineConfig,
                "max_depth must be at least 1",
            )
            .with_context("max_depth", "0"));
        }
        Ok(())
    }
}

/// Counters accumulated across inference calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InferenceStats {
    /// Forward-chaining rounds executed
    pub rounds: usize,
    /// Rule applications that produced a candidate fact
    pub rules_fired: usize,
    /// Facts added by forward chaining
    pub facts_derived: usize,
    /// Calls to `backward_chain`
    pub proofs_attempted: usize,
    /// Whether the last forward run reached a fixed point
    pub converged: bool,
}

/// Owns the knowledge base and runs inference over it
///
/// The knowledge base is an insertion-ordered set of nodes, so it doubles as
/// the index used to reject structurally duplicate facts.
#[derive(Debug, Clone, Default)]
pub struct InferenceEngine {
    pub(crate) knowledge_base: IndexSet<LogicalNode>,
    pub(crate) rules: Vec<RuleDefinition>,
    pub(crate) config: EngineConfig,
    pub(crate) stats: InferenceStats,
}

impl InferenceEngine {
    /// Seed an engine from a parsed program
    pub fn new(program: Program) -> Self {
        let mut engine = InferenceEngine::default();
        engine.add_program(program);
        engine
    }

    /// Seed an engine with explicit limits
    pub fn with_config(program: Program, config: EngineConfig) -> AiqlResult<Self> {
        config.validate()?;
        let mut engine = InferenceEngine {
            config,
            ..Default::default()
        };
        engine.add_program(program);
        Ok(engine)
    }

    /// Seed an engine from several programs, in order
    pub fn from_programs<I>(programs: I) -> Self
    where
        I: IntoIterator<Item = Program>,
    {
        let mut engine = InferenceEngine::default();
        for program in programs {
            engine.add_program(program);
        }
        engine
    }

    /// Add every top-level node of a program; returns how many were new
    pub fn add_program(&mut self, program: Program) -> usize {
        let mut added = 0;
        for node in program.body {
            if self.add_fact(node) {
                added += 1;
            }
        }
        added
    }

    /// Add a node unless an identical one is already known
    ///
    /// Rule definitions are also registered for chaining. Returns whether
    /// the node was new.
    pub fn add_fact(&mut self, node: LogicalNode) -> bool {
        if self.knowledge_base.contains(&node) {
            return false;
        }
        if let LogicalNode::Rule(rule) = &node {
            self.rules.push(rule.clone());
        }
        self.knowledge_base.insert(node)
    }

    /// Parse AIQL source and add its top-level nodes
    pub fn add_from_aiql(&mut self, source: &str) -> AiqlResult<usize> {
        let program = parse(source)?;
        let added = self.add_program(program);
        debug!(added, total = self.knowledge_base.len(), "added facts from source");
        Ok(added)
    }

    /// All known nodes in insertion order
    pub fn knowledge_base(&self) -> impl Iterator<Item = &LogicalNode> {
        self.knowledge_base.iter()
    }

    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> &InferenceStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.knowledge_base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knowledge_base.is_empty()
    }

    pub fn contains(&self, node: &LogicalNode) -> bool {
        self.knowledge_base.contains(node)
    }

    /// Statements of every top-level intent, flattened
    pub fn statements(&self) -> Vec<Statement> {
        self.knowledge_base
            .iter()
            .filter_map(|node| match node {
                LogicalNode::Intent(intent) => Some(intent.statements.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;

    fn fact(s: &str, r: &str, o: &str) -> LogicalNode {
        LogicalNode::fact(Statement::triple(s, r, o))
    }

    #[test]
    fn test_add_fact_is_idempotent() {
        let mut engine = InferenceEngine::default();
        assert!(engine.add_fact(fact("A", "P", "B")));
        assert!(!engine.add_fact(fact("A", "P", "B")));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_rules_are_registered() {
        let rule = RuleDefinition::new("r", fact("x", "P", "B"), fact("x", "Q", "B"));
        let program = Program::new(vec![LogicalNode::Rule(rule.clone()), fact("A", "P", "B")]);
        let engine = InferenceEngine::new(program);
        assert_eq!(engine.rules(), &[rule]);
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_add_from_aiql() {
        let mut engine = InferenceEngine::default();
        let added = engine
            .add_from_aiql("<A> [P] <B>\n<A> [P] <B>\n<C> [Q] <D>")
            .unwrap();
        assert_eq!(added, 2);
        assert!(engine.contains(&fact("C", "Q", "D")));
        assert!(engine.add_from_aiql("<A> [P").is_err());
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_from_programs_keeps_order() {
        let engine = InferenceEngine::from_programs(vec![
            Program::new(vec![fact("A", "P", "B")]),
            Program::new(vec![fact("C", "Q", "D"), fact("A", "P", "B")]),
        ]);
        let nodes: Vec<_> = engine.knowledge_base().cloned().collect();
        assert_eq!(nodes, vec![fact("A", "P", "B"), fact("C", "Q", "D")]);
    }

    #[test]
    fn test_statements_flatten_intents() {
        let mut engine = InferenceEngine::default();
        engine
            .add_from_aiql("!query { <A> [P] <B>; <C> [Q] <D> }\nnot <E> [R] <F>")
            .unwrap();
        assert_eq!(engine.statements().len(), 2);
    }

    #[test]
    fn test_with_config_validates() {
        let config = EngineConfig {
            max_depth: 0,
            ..Default::default()
        };
        let err = InferenceEngine::with_config(Program::default(), config).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEngineConfig);
    }
}
