//! Scripted decision providers for driving the turn loop in tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use backend::agents::{AgentDecisionProvider, DecisionContext};
use backend::domain::decision::{AgentDecision, DecisionError, ToolCall};

/// A decision that plays `game_move` with a stock reasoning line.
pub fn plain_move(game_move: Value) -> AgentDecision {
    AgentDecision {
        game_move: Some(game_move),
        reasoning: Some("scripted".into()),
        ..AgentDecision::default()
    }
}

/// A decision that resigns with a parting chat message.
pub fn exit_decision(message: &str) -> AgentDecision {
    AgentDecision {
        exit: true,
        chat_message: Some(message.into()),
        ..AgentDecision::default()
    }
}

/// A decision that requests a tool instead of moving.
pub fn tool_decision(name: &str) -> AgentDecision {
    AgentDecision {
        tool_call: Some(ToolCall {
            name: name.into(),
            arguments: json!({}),
        }),
        ..AgentDecision::default()
    }
}

/// Provider that replays a fixed script of decision results and records
/// the feedback each attempt arrived with.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<AgentDecision, DecisionError>>>,
    /// One entry per `decide` call: the feedback slice it was given.
    pub seen_feedback: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = Result<AgentDecision, DecisionError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            seen_feedback: Mutex::new(Vec::new()),
        }
    }

    /// A script that plays the given moves in order.
    pub fn of_moves(moves: impl IntoIterator<Item = Value>) -> Self {
        Self::new(moves.into_iter().map(|m| Ok(plain_move(m))))
    }
}

#[async_trait]
impl AgentDecisionProvider for ScriptedProvider {
    async fn decide(
        &self,
        ctx: &DecisionContext<'_>,
        _state_view: &Value,
        _possible_moves: Option<&Value>,
    ) -> Result<AgentDecision, DecisionError> {
        self.seen_feedback.lock().unwrap().push(ctx.feedback.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DecisionError::InvalidOutput("script exhausted".into())))
    }
}

/// Provider whose every answer is unusable.
pub struct BrokenProvider;

#[async_trait]
impl AgentDecisionProvider for BrokenProvider {
    async fn decide(
        &self,
        _ctx: &DecisionContext<'_>,
        _state_view: &Value,
        _possible_moves: Option<&Value>,
    ) -> Result<AgentDecision, DecisionError> {
        Err(DecisionError::InvalidOutput("gibberish response".into()))
    }
}

/// Provider that never answers. Used to trip the decision budget.
pub struct StalledProvider;

#[async_trait]
impl AgentDecisionProvider for StalledProvider {
    async fn decide(
        &self,
        _ctx: &DecisionContext<'_>,
        _state_view: &Value,
        _possible_moves: Option<&Value>,
    ) -> Result<AgentDecision, DecisionError> {
        // Far beyond any test budget; the loop's timeout fires first.
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Err(DecisionError::Provider("never reached".into()))
    }
}
