use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;

use super::ids::GameId;
use super::results::{ForfeitReason, GameResult};

/// Canonical event type strings.
///
/// Game environments may append their own event types; the constants here
/// cover everything the engine itself emits.
pub mod event_type {
    pub const MOVE_PLAYED: &str = "MOVE_PLAYED";
    pub const REASONING: &str = "REASONING";
    pub const CHAT: &str = "CHAT";
    pub const TOOL_CALL: &str = "TOOL_CALL";
    pub const AGENT_FORFEIT: &str = "AGENT_FORFEIT";
    pub const GAME_STARTED: &str = "GAME_STARTED";
    pub const GAME_FINISHED: &str = "GAME_FINISHED";
    pub const GAME_CANCELLED: &str = "GAME_CANCELLED";
    pub const PLAYER_JOINED: &str = "PLAYER_JOINED";
    pub const PLAYER_LEFT: &str = "PLAYER_LEFT";
    pub const TIMEOUT_FLAGGED: &str = "TIMEOUT_FLAGGED";
}

/// Where the applied move of a turn came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionSource {
    /// The agent produced the move itself.
    Agent,
    /// The environment's fallback move was applied after the agent failed.
    Fallback,
    /// The caller supplied the move, bypassing the agent.
    Override,
}

/// An event produced during processing but not yet persisted.
///
/// Drafts become `game_events` rows in append order when the turn commits.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub event_type: String,
    pub payload: Value,
}

impl EventDraft {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    pub fn move_played(player_id: i64, game_move: &Value) -> Self {
        Self::new(
            event_type::MOVE_PLAYED,
            json!({ "player_id": player_id, "move": game_move }),
        )
    }

    /// The per-turn reasoning record. `player_id` is the player that acted,
    /// captured before the move was applied.
    pub fn reasoning(
        player_id: i64,
        source: DecisionSource,
        reasoning: Option<&str>,
        chat_message: Option<&str>,
    ) -> Self {
        Self::new(
            event_type::REASONING,
            json!({
                "player_id": player_id,
                "source": source,
                "reasoning": reasoning,
                "chat_message": chat_message,
            }),
        )
    }

    pub fn chat(player_id: i64, message: &str) -> Self {
        Self::new(
            event_type::CHAT,
            json!({ "player_id": player_id, "message": message }),
        )
    }

    pub fn tool_call(player_id: i64, name: &str, arguments: &Value) -> Self {
        Self::new(
            event_type::TOOL_CALL,
            json!({ "player_id": player_id, "name": name, "arguments": arguments }),
        )
    }

    pub fn agent_forfeit(player_id: i64, reason: ForfeitReason) -> Self {
        Self::new(
            event_type::AGENT_FORFEIT,
            json!({ "player_id": player_id, "reason": reason }),
        )
    }

    pub fn game_started(player_ids: &[i64]) -> Self {
        Self::new(event_type::GAME_STARTED, json!({ "player_ids": player_ids }))
    }

    pub fn game_finished(result: &GameResult) -> Self {
        Self::new(event_type::GAME_FINISHED, json!({ "result": result }))
    }

    pub fn game_cancelled(reason: &str) -> Self {
        Self::new(event_type::GAME_CANCELLED, json!({ "reason": reason }))
    }

    pub fn player_joined(player_id: i64, display_name: &str) -> Self {
        Self::new(
            event_type::PLAYER_JOINED,
            json!({ "player_id": player_id, "display_name": display_name }),
        )
    }

    pub fn player_left(player_id: i64) -> Self {
        Self::new(event_type::PLAYER_LEFT, json!({ "player_id": player_id }))
    }

    pub fn timeout_flagged(player_id: i64) -> Self {
        Self::new(event_type::TIMEOUT_FLAGGED, json!({ "player_id": player_id }))
    }
}

/// An event row read back from the append-only log.
///
/// `id` carries the append order within a game. Engines receive slices of
/// these when building per-player views of the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    pub game_id: GameId,
    pub event_type: String,
    pub payload: Value,
    pub created_at: OffsetDateTime,
}
