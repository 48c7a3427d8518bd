use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by an agent instead of a move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Raw decision output of an agent for one attempt.
///
/// Providers return this structure as-is; `classify` turns it into exactly
/// one action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentDecision {
    #[serde(rename = "move", default)]
    pub game_move: Option<Value>,
    #[serde(default)]
    pub tool_call: Option<ToolCall>,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub chat_message: Option<String>,
}

/// The single action distilled from an `AgentDecision`.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionAction {
    /// The agent resigns from the game. Always carries a parting message.
    Exit { chat_message: String },
    /// The agent wants tool output before moving again.
    ToolCall { call: ToolCall },
    /// The agent plays a move.
    Move { game_move: Value },
}

/// A classified decision plus the names of any fields that were set but
/// outranked. Callers log the discards; classification itself stays pure.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub action: DecisionAction,
    pub discarded: Vec<&'static str>,
}

impl AgentDecision {
    /// Resolve a decision to one action.
    ///
    /// When several fields are set, precedence is exit, then tool call, then
    /// move. An exit without a chat message and a decision with no actionable
    /// field at all are both invalid; the error string is fed back to the
    /// agent verbatim on the next attempt.
    pub fn classify(&self) -> Result<Classified, String> {
        if self.exit {
            let chat_message = match self.chat_message.as_deref() {
                Some(msg) if !msg.trim().is_empty() => msg.to_string(),
                _ => {
                    return Err(
                        "exit requires a chat_message explaining the resignation".to_string()
                    )
                }
            };
            let mut discarded = Vec::new();
            if self.tool_call.is_some() {
                discarded.push("tool_call");
            }
            if self.game_move.is_some() {
                discarded.push("move");
            }
            return Ok(Classified {
                action: DecisionAction::Exit { chat_message },
                discarded,
            });
        }

        if let Some(call) = &self.tool_call {
            let discarded = if self.game_move.is_some() {
                vec!["move"]
            } else {
                vec![]
            };
            return Ok(Classified {
                action: DecisionAction::ToolCall { call: call.clone() },
                discarded,
            });
        }

        if let Some(game_move) = &self.game_move {
            return Ok(Classified {
                action: DecisionAction::Move {
                    game_move: game_move.clone(),
                },
                discarded: vec![],
            });
        }

        Err("decision contained no move, tool_call, or exit".to_string())
    }
}

/// Failures from an agent decision provider.
///
/// Every variant is retryable within the turn's attempt and time budget;
/// exhaustion is handled by the decision loop, not here.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionError {
    /// The provider could not be reached or returned a transport error.
    Provider(String),
    /// The provider responded with output that does not parse as a decision.
    InvalidOutput(String),
    /// The provider gave up after exhausting its own internal retries.
    MaxIterationsExceeded(String),
}

impl std::fmt::Display for DecisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionError::Provider(msg) => write!(f, "provider error: {msg}"),
            DecisionError::InvalidOutput(msg) => write!(f, "invalid agent output: {msg}"),
            DecisionError::MaxIterationsExceeded(msg) => {
                write!(f, "provider retries exhausted: {msg}")
            }
        }
    }
}

impl std::error::Error for DecisionError {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decision(game_move: Option<Value>, tool: Option<ToolCall>, exit: bool) -> AgentDecision {
        AgentDecision {
            game_move,
            tool_call: tool,
            exit,
            reasoning: Some("because".into()),
            chat_message: Some("gg".into()),
        }
    }

    #[test]
    fn exit_outranks_everything() {
        let d = decision(
            Some(json!({"from": "e2", "to": "e4"})),
            Some(ToolCall {
                name: "legal_moves".into(),
                arguments: json!({}),
            }),
            true,
        );
        let classified = d.classify().unwrap();
        assert!(matches!(classified.action, DecisionAction::Exit { .. }));
        assert_eq!(classified.discarded, vec!["tool_call", "move"]);
    }

    #[test]
    fn exit_without_chat_is_invalid() {
        let mut d = decision(None, None, true);
        d.chat_message = None;
        assert!(d.classify().is_err());

        d.chat_message = Some("   ".into());
        assert!(d.classify().is_err());
    }

    #[test]
    fn tool_call_outranks_move() {
        let d = decision(
            Some(json!({"fold": true})),
            Some(ToolCall {
                name: "pot_odds".into(),
                arguments: json!({"street": "river"}),
            }),
            false,
        );
        let classified = d.classify().unwrap();
        assert!(matches!(classified.action, DecisionAction::ToolCall { .. }));
        assert_eq!(classified.discarded, vec!["move"]);
    }

    #[test]
    fn plain_move_classifies_clean() {
        let d = decision(Some(json!({"from": "g1", "to": "f3"})), None, false);
        let classified = d.classify().unwrap();
        assert_eq!(
            classified.action,
            DecisionAction::Move {
                game_move: json!({"from": "g1", "to": "f3"})
            }
        );
        assert!(classified.discarded.is_empty());
    }

    #[test]
    fn empty_decision_is_invalid() {
        let d = AgentDecision::default();
        let err = d.classify().unwrap_err();
        assert!(err.contains("no move"));
    }

    #[test]
    fn deserializes_provider_json() {
        let d: AgentDecision = serde_json::from_str(
            r#"{"move": {"from": "e2", "to": "e4"}, "reasoning": "control the center"}"#,
        )
        .unwrap();
        assert_eq!(d.game_move, Some(json!({"from": "e2", "to": "e4"})));
        assert!(!d.exit);
        assert_eq!(d.reasoning.as_deref(), Some("control the center"));
    }
}
