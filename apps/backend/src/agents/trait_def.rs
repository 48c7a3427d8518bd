//! Agent decision provider trait definition.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::decision::{AgentDecision, DecisionError};
use crate::domain::ids::GameId;
use crate::entities::games::GameType;

/// Everything a provider may want to know about the attempt it is asked to
/// decide.
///
/// `agent_version_id` identifies the agent configuration; providers resolve
/// model, prompt, and tuning from it. `feedback` carries the error strings
/// and tool results accumulated by earlier attempts of the same turn, oldest
/// first.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionContext<'a> {
    pub game_id: &'a GameId,
    pub game_type: GameType,
    pub player_id: i64,
    pub agent_version_id: i64,
    pub turn: i32,
    /// 1-based attempt number within the current turn.
    pub attempt: u32,
    pub feedback: &'a [String],
}

/// Trait for agent decision providers.
///
/// Implementations receive the state as the player sees it and must return
/// a decision for this attempt. A provider call is network I/O; callers
/// wrap it in a wall-clock timeout and never hold a database transaction
/// across it.
#[async_trait]
pub trait AgentDecisionProvider: Send + Sync {
    /// Decide one attempt.
    ///
    /// `possible_moves` is `None` for game types that do not enumerate
    /// moves. Providers must not treat `Some` as exhaustive validation;
    /// the environment still rejects illegal moves on apply.
    async fn decide(
        &self,
        ctx: &DecisionContext<'_>,
        state_view: &Value,
        possible_moves: Option<&Value>,
    ) -> Result<AgentDecision, DecisionError>;
}
