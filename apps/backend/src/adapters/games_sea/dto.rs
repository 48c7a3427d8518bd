//! DTOs for games_sea adapter.

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::entities::games::{GameType, MatchmakingStatus};

/// DTO for inserting a new game row.
#[derive(Debug, Clone)]
pub struct GameCreate {
    pub id: String,
    pub game_type: GameType,
    pub status: MatchmakingStatus,
    pub state: Value,
    pub current_turn: i32,
    pub waiting_deadline: Option<OffsetDateTime>,
    pub is_playground: bool,
}

impl GameCreate {
    pub fn new(id: impl Into<String>, game_type: GameType, state: Value) -> Self {
        Self {
            id: id.into(),
            game_type,
            status: MatchmakingStatus::Waiting,
            state,
            current_turn: 0,
            waiting_deadline: None,
            is_playground: false,
        }
    }

    pub fn with_status(mut self, status: MatchmakingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_current_turn(mut self, turn: i32) -> Self {
        self.current_turn = turn;
        self
    }

    pub fn with_waiting_deadline(mut self, deadline: OffsetDateTime) -> Self {
        self.waiting_deadline = Some(deadline);
        self
    }

    pub fn playground(mut self) -> Self {
        self.is_playground = true;
        self
    }
}

/// Inputs for one lease claim attempt.
///
/// The timeouts travel with the claim so the conditional update can decide
/// staleness in a single statement.
#[derive(Debug, Clone)]
pub struct ProcessingClaim {
    pub game_id: String,
    pub request_id: String,
    pub processing_timeout: Duration,
    pub heartbeat_timeout: Duration,
    pub expected_turn: Option<i32>,
}

impl ProcessingClaim {
    pub fn new(
        game_id: impl Into<String>,
        request_id: impl Into<String>,
        processing_timeout: Duration,
        heartbeat_timeout: Duration,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            request_id: request_id.into(),
            processing_timeout,
            heartbeat_timeout,
            expected_turn: None,
        }
    }

    pub fn expecting_turn(mut self, turn: i32) -> Self {
        self.expected_turn = Some(turn);
        self
    }
}

/// Unified DTO for updating game fields with optimistic locking.
///
/// Any combination of fields lands atomically with a single version
/// increment. `expected_version` validates that the row's version still
/// matches what the caller read.
#[derive(Debug, Clone)]
pub struct GameUpdate {
    pub id: String,
    pub expected_version: i32,
    pub state: Option<Value>,
    pub status: Option<MatchmakingStatus>,
    pub current_turn: Option<i32>,
    /// Three-state: None = no change, Some(Some(ts)) = set, Some(None) = clear.
    pub waiting_deadline: Option<Option<OffsetDateTime>>,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
}

impl GameUpdate {
    pub fn new(id: impl Into<String>, expected_version: i32) -> Self {
        Self {
            id: id.into(),
            expected_version,
            state: None,
            status: None,
            current_turn: None,
            waiting_deadline: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_status(mut self, status: MatchmakingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_current_turn(mut self, turn: i32) -> Self {
        self.current_turn = Some(turn);
        self
    }

    pub fn with_waiting_deadline(mut self, deadline: OffsetDateTime) -> Self {
        self.waiting_deadline = Some(Some(deadline));
        self
    }

    pub fn clear_waiting_deadline(mut self) -> Self {
        self.waiting_deadline = Some(None);
        self
    }

    pub fn with_started_at(mut self, at: OffsetDateTime) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn with_finished_at(mut self, at: OffsetDateTime) -> Self {
        self.finished_at = Some(at);
        self
    }
}
