//! Agent decision providers.
//!
//! A provider turns a player view of the game into an [`AgentDecision`]
//! for one attempt. The production provider calls out to an LLM; the
//! [`RandomDecisionProvider`] here is the reference implementation and the
//! default for tests and system-agent seats.
//!
//! [`AgentDecision`]: crate::domain::AgentDecision

pub mod random;
pub mod trait_def;

pub use random::RandomDecisionProvider;
pub use trait_def::{AgentDecisionProvider, DecisionContext};
