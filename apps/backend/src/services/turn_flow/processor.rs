use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::TurnFlowService;
use crate::db::with_txn;
use crate::domain::ids::GameId;
use crate::domain::results::GameResult;
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError, NotFoundKind};
use crate::repos::games::{Game, ProcessingClaim};
use crate::repos::{events, games, players};
use crate::state::AppState;
use crate::trace_ctx;

/// One turn-processing request, as delivered by a queue consumer or an
/// operator endpoint.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Caller-chosen id for this attempt; doubles as the lease holder.
    pub request_id: String,
    pub game_id: GameId,
    /// The player expected to act.
    pub player_id: i64,
    /// The turn the caller believes the game is at. A duplicate or delayed
    /// request fails the claim instead of replaying a finished turn.
    pub expected_turn: i32,
    /// Operator-supplied move that bypasses the agent when valid.
    pub move_override: Option<Value>,
}

impl TurnRequest {
    pub fn new(
        request_id: impl Into<String>,
        game_id: GameId,
        player_id: i64,
        expected_turn: i32,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            game_id,
            player_id,
            expected_turn,
            move_override: None,
        }
    }

    pub fn with_move_override(mut self, game_move: Value) -> Self {
        self.move_override = Some(game_move);
        self
    }
}

/// How a processed turn left the game.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The move was applied and play continues.
    Continued { turn: i32, version: i32 },
    /// The turn finished the game, by play or by forfeit.
    Finished { result: GameResult, version: i32 },
}

impl TurnFlowService {
    /// Process one turn end to end.
    ///
    /// Failure to claim aborts with no side effects. After the claim, every
    /// path out releases the lease, including errors.
    pub async fn process_turn(
        &self,
        state: &AppState,
        request: TurnRequest,
    ) -> Result<TurnOutcome, AppError> {
        // The request id doubles as the trace id for everything this turn
        // logs or returns in problem details.
        trace_ctx::with_trace_id(
            request.request_id.clone(),
            self.process_turn_scoped(state, request),
        )
        .await
    }

    async fn process_turn_scoped(
        &self,
        state: &AppState,
        request: TurnRequest,
    ) -> Result<TurnOutcome, AppError> {
        let limits = state.limits;
        let claim = ProcessingClaim::new(
            request.game_id.as_str(),
            request.request_id.as_str(),
            limits.processing_timeout,
            limits.heartbeat_timeout,
        )
        .expecting_turn(request.expected_turn);

        let game = with_txn(state, |txn| {
            Box::pin(async move { Ok(games::start_processing(txn, claim).await?) })
        })
        .await?;

        info!(
            game_id = %request.game_id,
            request_id = %request.request_id,
            turn = game.current_turn,
            "processing lease claimed"
        );

        let outcome = self.run_claimed_turn(state, &request, &game).await;
        self.release(state, &request.game_id, &request.request_id)
            .await;
        outcome
    }

    async fn run_claimed_turn(
        &self,
        state: &AppState,
        request: &TurnRequest,
        game: &Game,
    ) -> Result<TurnOutcome, AppError> {
        let env = state.registry.env(game.game_type)?;

        // The claim already pinned the turn; these guard terminal states and
        // the acting player against stale or misrouted requests.
        if game.state.is_finished || game.status.is_terminal() {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyFinished,
                format!("Game {} is already finished", game.id),
            )
            .into());
        }
        let Some(current_player_id) = game.state.current_player_id else {
            return Err(DomainError::conflict(
                ConflictKind::NotPlayersTurn,
                format!("Game {} has no player to move", game.id),
            )
            .into());
        };
        if current_player_id != request.player_id {
            return Err(DomainError::conflict(
                ConflictKind::NotPlayersTurn,
                format!(
                    "Player {} asked to move but it is player {}'s turn",
                    request.player_id, current_player_id
                ),
            )
            .into());
        }

        let seats = players::find_all_by_game(&state.db, &game.id).await?;
        let Some(actor) = seats.iter().find(|p| p.id == request.player_id) else {
            return Err(DomainError::not_found(
                NotFoundKind::Player,
                format!("Player {} is not seated in game {}", request.player_id, game.id),
            )
            .into());
        };

        // An already-expired clock settles without asking the agent.
        if env.uses_time_control() && env.time_expired(&game.state, OffsetDateTime::now_utc()) {
            return self
                .settle_timeout(state, game, env.as_ref(), &seats, request.player_id)
                .await;
        }

        let history = events::find_all_by_game(&state.db, &game.id).await?;
        let resolution = self
            .resolve_move(state, request, game, env.as_ref(), actor, &seats, &history)
            .await?;
        self.persist_turn(state, game, env.as_ref(), &seats, resolution)
            .await
    }

    /// Clear the lease if this request still holds it. Losing the release
    /// race to a timeout takeover is accepted, so failures only log.
    pub(super) async fn release(&self, state: &AppState, game_id: &GameId, request_id: &str) {
        let released = with_txn(state, |txn| {
            let game_id = game_id.clone();
            let request_id = request_id.to_string();
            Box::pin(async move { Ok(games::finish_processing(txn, &game_id, &request_id).await?) })
        })
        .await;

        if let Err(e) = released {
            warn!(
                game_id = %game_id,
                request_id,
                error = %e,
                "failed to release processing lease"
            );
        }
    }
}
