//! Random decision provider - plays a uniformly random legal move.
//!
//! Reference implementation of [`AgentDecisionProvider`]. It never calls
//! out to a model, which makes it the default for system-agent seats and
//! for tests: thread-safe via `Mutex<StdRng>`, deterministic when seeded,
//! and it only ever picks from the moves the environment enumerated.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::prelude::*;
use serde_json::Value;

use super::trait_def::{AgentDecisionProvider, DecisionContext};
use crate::domain::decision::{AgentDecision, DecisionError};

/// Provider that chooses uniformly at random from the enumerated moves.
///
/// Only usable with game types whose environment enumerates possible moves;
/// when none are supplied the decision fails as an empty response and the
/// turn falls through to the fallback path.
pub struct RandomDecisionProvider {
    rng: Mutex<StdRng>,
}

impl RandomDecisionProvider {
    /// `Some(seed)` gives reproducible picks for tests; `None` seeds from
    /// system entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Default for RandomDecisionProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl AgentDecisionProvider for RandomDecisionProvider {
    async fn decide(
        &self,
        _ctx: &DecisionContext<'_>,
        _state_view: &Value,
        possible_moves: Option<&Value>,
    ) -> Result<AgentDecision, DecisionError> {
        let moves = match possible_moves.and_then(Value::as_array) {
            Some(moves) if !moves.is_empty() => moves,
            _ => {
                return Err(DecisionError::InvalidOutput(
                    "No enumerated possible moves to choose from".into(),
                ))
            }
        };

        let mut rng = self
            .rng
            .lock()
            .map_err(|e| DecisionError::Provider(format!("RNG lock poisoned: {e}")))?;

        let choice = moves
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| DecisionError::Provider("Failed to choose a random move".into()))?;

        Ok(AgentDecision {
            game_move: Some(choice),
            reasoning: Some(format!(
                "Picked uniformly from {} possible moves",
                moves.len()
            )),
            ..AgentDecision::default()
        })
    }
}
