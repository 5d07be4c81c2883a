//! Inference over an AIQL knowledge base
//!
//! The [`InferenceEngine`] owns an insertion-ordered set of logical nodes
//! seeded from parsed programs, plus the rule definitions found in them.
//!
//! # Available Operations
//!
//! - `unify`: Bind pattern variables against a target node
//! - `forward_chain`: Bottom-up, data-driven derivation of new facts
//! - `backward_chain`: Top-down, goal-directed proof search
//! - `check_consistency`: Direct and implication contradictions
//! - `check_semantic_consistency` / `trust_conflicts`: Delegation to
//!   external ontology and trust collaborators
//!
//! # Usage
//!
//! ```ignore
//! use aiql::{parse, InferenceEngine};
//!
//! let program = parse("<Socrates> [IsA] <Human>")?;
//! let mut engine = InferenceEngine::new(program);
//!
//! // Forward chaining: derive consequences
//! let derived = engine.forward_chain(10);
//!
//! // Backward chaining: prove a specific goal
//! let result = engine.backward_chain(&goal);
//! ```
//!
//! Unification, proof and consistency outcomes are ordinary values; none of
//! these operations return errors.

mod backward;
mod consistency;
mod engine;
mod forward;
mod proof;
mod semantic;
mod unify;

pub use backward::AssumptionGuard;
pub use consistency::{ConsistencyReport, Contradiction, ContradictionKind};
pub use engine::{EngineConfig, InferenceEngine, InferenceStats};
pub use proof::{
    Proof, ProofFormatter, ProofResult, ProofStep, CONJUNCTION_INTRODUCTION,
    IMPLICATION_INTRODUCTION, KNOWN_FACT,
};
pub use semantic::{OntologyReasoner, SemanticFinding, TrustConflict, TrustRegistry};
pub use unify::{is_pattern_variable, unify, Substitution};
