//! Game repository functions for the domain layer.

use sea_orm::{ConnectionTrait, DatabaseTransaction};
use time::OffsetDateTime;

use crate::adapters::games_sea as games_adapter;
use crate::domain::ids::GameId;
use crate::domain::state::GameState;
use crate::entities::games::{self, GameType, MatchmakingStatus};
use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind};

pub use games_adapter::{GameCreate, GameUpdate, ProcessingClaim};

/// Game domain model.
///
/// Loaded through the repos functions with the state envelope already
/// decoded; a row whose id or state fails to decode surfaces as data
/// corruption at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: GameId,
    pub game_type: GameType,
    pub status: MatchmakingStatus,
    pub state: GameState,
    pub version: i32,
    pub current_turn: i32,
    pub processing_request_id: Option<String>,
    pub processing_started_at: Option<OffsetDateTime>,
    pub waiting_deadline: Option<OffsetDateTime>,
    pub is_playground: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
}

impl Game {
    /// Whether the row currently carries a lease.
    pub fn has_lease(&self) -> bool {
        self.processing_request_id.is_some()
    }
}

impl TryFrom<games::Model> for Game {
    type Error = DomainError;

    fn try_from(model: games::Model) -> Result<Self, Self::Error> {
        let id = GameId::parse(&model.id).map_err(|_| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!("Stored game id {:?} is not a ULID", model.id),
            )
        })?;
        let state = GameState::from_db_value(model.state)?;

        Ok(Self {
            id,
            game_type: model.game_type,
            status: model.status,
            state,
            version: model.version,
            current_turn: model.current_turn,
            processing_request_id: model.processing_request_id,
            processing_started_at: model.processing_started_at,
            waiting_deadline: model.waiting_deadline,
            is_playground: model.is_playground,
            created_at: model.created_at,
            updated_at: model.updated_at,
            started_at: model.started_at,
            finished_at: model.finished_at,
        })
    }
}

/// Forward-only matchmaking status guard. Terminal states never transition
/// again.
pub fn ensure_status_transition(
    from: MatchmakingStatus,
    to: MatchmakingStatus,
) -> Result<(), DomainError> {
    use MatchmakingStatus::{Cancelled, Finished, InProgress, Waiting};

    let allowed = matches!(
        (from, to),
        (Waiting, InProgress) | (Waiting, Cancelled) | (InProgress, Finished) | (InProgress, Cancelled)
    );

    if allowed {
        Ok(())
    } else {
        Err(DomainError::conflict(
            ConflictKind::StatusTransition,
            format!("Illegal status transition {from} -> {to}"),
        ))
    }
}

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &GameId,
) -> Result<Option<Game>, DomainError> {
    let game = games_adapter::find_by_id(conn, game_id.as_str()).await?;
    game.map(Game::try_from).transpose()
}

/// Find game by ID or return an error if not found.
pub async fn require_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &GameId,
) -> Result<Game, DomainError> {
    let game = games_adapter::require_game(conn, game_id.as_str()).await?;
    Game::try_from(game)
}

/// Find and row-lock a game for a capacity check-and-increment.
pub async fn find_by_id_locked(
    txn: &DatabaseTransaction,
    game_id: &GameId,
) -> Result<Option<Game>, DomainError> {
    let game = games_adapter::find_by_id_locked(txn, game_id.as_str()).await?;
    game.map(Game::try_from).transpose()
}

pub async fn create_game(
    txn: &DatabaseTransaction,
    dto: GameCreate,
) -> Result<Game, DomainError> {
    let game = games_adapter::create_game(txn, dto).await?;
    Game::try_from(game)
}

/// Claim the processing lease. See the adapter for the claim conditions;
/// failures arrive as `AlreadyProcessing`, `TurnConflict`, or `NotFound`.
pub async fn start_processing(
    txn: &DatabaseTransaction,
    claim: ProcessingClaim,
) -> Result<Game, DomainError> {
    let game = games_adapter::start_processing(txn, claim).await?;
    Game::try_from(game)
}

/// Release the lease iff held by `request_id`; otherwise a no-op.
pub async fn finish_processing(
    txn: &DatabaseTransaction,
    game_id: &GameId,
    request_id: &str,
) -> Result<(), DomainError> {
    games_adapter::finish_processing(txn, game_id.as_str(), request_id).await?;
    Ok(())
}

/// Update game fields under optimistic locking.
pub async fn update_game(txn: &DatabaseTransaction, dto: GameUpdate) -> Result<Game, DomainError> {
    let game = games_adapter::update_game(txn, dto).await?;
    Game::try_from(game)
}

/// WAITING games of one type still open for joins.
pub async fn find_open_waiting<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_type: GameType,
    now: OffsetDateTime,
) -> Result<Vec<Game>, DomainError> {
    let games = games_adapter::find_open_waiting(conn, game_type, now).await?;
    games.into_iter().map(Game::try_from).collect()
}

/// WAITING games whose deadline has passed.
pub async fn find_expired_waiting<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    now: OffsetDateTime,
) -> Result<Vec<Game>, DomainError> {
    let games = games_adapter::find_expired_waiting(conn, now).await?;
    games.into_iter().map(Game::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        use MatchmakingStatus::{Cancelled, Finished, InProgress, Waiting};

        assert!(ensure_status_transition(Waiting, InProgress).is_ok());
        assert!(ensure_status_transition(Waiting, Cancelled).is_ok());
        assert!(ensure_status_transition(InProgress, Finished).is_ok());
        assert!(ensure_status_transition(InProgress, Cancelled).is_ok());
    }

    #[test]
    fn terminal_states_never_transition() {
        use MatchmakingStatus::{Cancelled, Finished, InProgress, Waiting};

        for from in [Finished, Cancelled] {
            for to in [Waiting, InProgress, Finished, Cancelled] {
                let err = ensure_status_transition(from, to).unwrap_err();
                assert!(matches!(
                    err,
                    DomainError::Conflict(ConflictKind::StatusTransition, _)
                ));
            }
        }
    }

    #[test]
    fn waiting_cannot_skip_to_finished() {
        use MatchmakingStatus::{Finished, Waiting};

        assert!(ensure_status_transition(Waiting, Finished).is_err());
        assert!(ensure_status_transition(Waiting, Waiting).is_err());
    }
}
