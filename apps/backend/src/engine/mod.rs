//! Game-type capability layer.
//!
//! Each supported game type implements [`GameEnv`] over the shared JSON
//! state envelope. The orchestration services never look inside a game's
//! state beyond the envelope fields; everything game-specific flows
//! through this trait.

pub mod registry;

pub use registry::GameRegistry;

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::domain::events::{EventDraft, StoredEvent};
use crate::domain::ids::GameId;
use crate::domain::results::GameResult;
use crate::domain::state::GameState;
use crate::entities::games::GameType;
use crate::errors::domain::{DomainError, ValidationKind};

/// A seat as the services hand it to a game environment.
///
/// `player_id` is the `game_players` row id; it is the identity used inside
/// game state, events, and results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatedPlayer {
    pub player_id: i64,
    pub agent_version_id: i64,
    pub display_name: String,
    pub is_system: bool,
}

/// What a game environment wants done after a mid-game departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerLeftOutcome {
    /// The game keeps running with the remaining players.
    Continue,
    /// Declare the remaining player(s) winners by forfeit.
    Finish,
    /// Nobody is left to play; cancel the game.
    Cancel,
}

/// A system-controlled agent that can fill an empty seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackAgent {
    pub agent_version_id: i64,
    pub display_name: String,
}

/// Matchmaking profile for one game type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRules {
    pub min_players: usize,
    pub max_players: usize,
    /// Tokens charged after a successful join. Zero disables billing.
    pub entry_fee: i64,
    /// How long a WAITING game may sit before the timeout sweep acts on it.
    pub waiting_timeout: Duration,
    /// Agents the sweep may seat to fill a short-handed game, in preference
    /// order. Also the pool for mid-game replacement.
    pub fallback_agents: Vec<FallbackAgent>,
}

/// Capabilities one game type exposes to the orchestration services.
///
/// Implementations mutate the state envelope and report events as drafts;
/// they never touch the database. Persistence, leases, and transactions all
/// stay in the services layer.
pub trait GameEnv: Send + Sync {
    fn game_type(&self) -> GameType;

    /// Build the zero-player initial state for a fresh game.
    fn new_game(&self, game_id: &GameId) -> Result<(GameState, Vec<EventDraft>), DomainError>;

    /// Seat a player. Called for every player before the start, and again
    /// when a fallback agent replaces a mid-game leaver.
    fn join_player(&self, state: &mut GameState, player: &SeatedPlayer)
        -> Result<(), DomainError>;

    /// Advance into the first (or next) round once seating is settled.
    fn new_round(&self, state: &mut GameState) -> Result<(), DomainError>;

    /// Apply the current player's move.
    ///
    /// Mutates the state and reports follow-on events (round transitions,
    /// game finish). Fails with an `IllegalMove` validation error when the
    /// move is invalid for the current state.
    fn apply_move(
        &self,
        state: &mut GameState,
        game_move: &Value,
    ) -> Result<Vec<EventDraft>, DomainError>;

    /// Enumerate the legal moves for a player, or `None` when this game
    /// type does not enumerate moves.
    fn possible_moves(&self, state: &GameState, player_id: i64) -> Option<Value>;

    /// Project the state for one player, redacting hidden information such
    /// as other players' cards and private reasoning carried in `events`.
    fn player_view(&self, state: &GameState, player_id: i64, events: &[StoredEvent]) -> Value;

    /// A safe move to play when the agent fails its turn. `None` for game
    /// types with no safe fallback, such as Chess.
    fn error_fallback_move(&self, state: &GameState, player_id: i64) -> Option<Value>;

    /// React to a player leaving an IN_PROGRESS game. The environment may
    /// mutate the state (fold the hand, vacate the seat) before reporting
    /// the outcome.
    fn on_player_left(
        &self,
        state: &mut GameState,
        player_id: i64,
    ) -> Result<PlayerLeftOutcome, DomainError>;

    /// Finish the game with `remaining` as winners by forfeit.
    fn finish_due_to_forfeit(
        &self,
        state: &mut GameState,
        remaining: &[i64],
    ) -> Result<(), DomainError>;

    /// Read the final result out of a finished state.
    fn extract_game_result(&self, state: &GameState) -> Result<GameResult, DomainError>;

    /// Seating order for a fresh game, e.g. randomized colors in Chess.
    fn order_player_ids_for_start(&self, player_ids: Vec<i64>) -> Vec<i64> {
        player_ids
    }

    /// Whether this game type runs per-player clocks.
    fn uses_time_control(&self) -> bool {
        false
    }

    /// Whether the current player's clock has run out as of `now`.
    fn time_expired(&self, _state: &GameState, _now: OffsetDateTime) -> bool {
        false
    }

    /// Settle a game whose current player ran out of time, reporting the
    /// events that record it.
    fn finalize_timeout(
        &self,
        _state: &mut GameState,
        _player_id: i64,
    ) -> Result<Vec<EventDraft>, DomainError> {
        Err(DomainError::validation(
            ValidationKind::InvalidInput,
            format!("{} does not use time control", self.game_type()),
        ))
    }

    /// Vet a caller-supplied state overlay before a playground game starts.
    fn validate_custom_state(&self, _state: &GameState) -> Result<(), DomainError> {
        Ok(())
    }
}
