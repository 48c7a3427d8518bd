//! SeaORM adapter for the game repository - generic over ConnectionTrait.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::games::{self, GameType, MatchmakingStatus};
use crate::infra::db_errors::{
    PAYLOAD_ALREADY_PROCESSING, PAYLOAD_GAME_NOT_FOUND, PAYLOAD_OPTIMISTIC_LOCK,
    PAYLOAD_TURN_CONFLICT,
};

pub mod dto;

pub use dto::{GameCreate, GameUpdate, ProcessingClaim};

// Adapter functions return DbErr; repos layer maps to DomainError via From<DbErr>.

fn game_not_found(game_id: &str) -> sea_orm::DbErr {
    sea_orm::DbErr::Custom(format!("{PAYLOAD_GAME_NOT_FOUND}{game_id}"))
}

fn turn_conflict(expected: i32, actual: i32) -> sea_orm::DbErr {
    sea_orm::DbErr::Custom(format!(
        "{PAYLOAD_TURN_CONFLICT}{{\"expected\":{expected},\"actual\":{actual}}}"
    ))
}

fn already_processing(holder: &str) -> sea_orm::DbErr {
    let payload = serde_json::json!({ "holder": holder });
    sea_orm::DbErr::Custom(format!("{PAYLOAD_ALREADY_PROCESSING}{payload}"))
}

fn optimistic_lock(expected: i32, actual: i32) -> sea_orm::DbErr {
    sea_orm::DbErr::Custom(format!(
        "{PAYLOAD_OPTIMISTIC_LOCK}{{\"expected\":{expected},\"actual\":{actual}}}"
    ))
}

/// Helper: apply a version-gated update, then refetch.
///
/// This consolidates the repetitive pattern:
/// - Adds the version increment and `updated_at` to the update
/// - Filters by id and expected version
/// - Checks rows_affected to distinguish NotFound vs OptimisticLock
/// - Refetches and returns the updated row
///
/// The caller provides a closure that configures the columns to change.
async fn versioned_update_then_fetch<C, F>(
    conn: &C,
    game_id: &str,
    expected_version: i32,
    configure_update: F,
) -> Result<games::Model, sea_orm::DbErr>
where
    C: ConnectionTrait + Send + Sync,
    F: FnOnce(sea_orm::UpdateMany<games::Entity>) -> sea_orm::UpdateMany<games::Entity>,
{
    let now = time::OffsetDateTime::now_utc();

    let result = configure_update(games::Entity::update_many())
        .col_expr(games::Column::UpdatedAt, Expr::val(now).into())
        .col_expr(
            games::Column::Version,
            Expr::col(games::Column::Version).add(1),
        )
        .filter(games::Column::Id.eq(game_id))
        .filter(games::Column::Version.eq(expected_version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        // Either the game does not exist or the version moved under us.
        return match games::Entity::find_by_id(game_id).one(conn).await? {
            Some(game) => Err(optimistic_lock(expected_version, game.version)),
            None => Err(game_not_found(game_id)),
        };
    }

    games::Entity::find_by_id(game_id)
        .one(conn)
        .await?
        .ok_or_else(|| game_not_found(game_id))
}

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &str,
) -> Result<Option<games::Model>, sea_orm::DbErr> {
    games::Entity::find_by_id(game_id).one(conn).await
}

/// Find game by ID or return a not-found error.
pub async fn require_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &str,
) -> Result<games::Model, sea_orm::DbErr> {
    find_by_id(conn, game_id)
        .await?
        .ok_or_else(|| game_not_found(game_id))
}

/// Find and row-lock a game for a capacity check-and-increment.
///
/// `SELECT ... FOR UPDATE`; on SQLite the lock clause renders as nothing.
pub async fn find_by_id_locked<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &str,
) -> Result<Option<games::Model>, sea_orm::DbErr> {
    games::Entity::find_by_id(game_id)
        .lock_exclusive()
        .one(conn)
        .await
}

/// Insert a new game row at version 0 with no lease held.
pub async fn create_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: GameCreate,
) -> Result<games::Model, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let game = games::ActiveModel {
        id: Set(dto.id),
        game_type: Set(dto.game_type),
        status: Set(dto.status),
        state: Set(dto.state),
        version: Set(0),
        current_turn: Set(dto.current_turn),
        processing_request_id: Set(None),
        processing_started_at: Set(None),
        waiting_deadline: Set(dto.waiting_deadline),
        is_playground: Set(dto.is_playground),
        created_at: Set(now),
        updated_at: Set(now),
        started_at: Set(None),
        finished_at: Set(None),
    };

    game.insert(conn).await
}

/// Claim the processing lease for one turn attempt.
///
/// The single conditional UPDATE is the entire mutual-exclusion mechanism:
/// the claim lands iff the lease is free or stale, and the turn matches when
/// one is expected. A refused claim refetches the row once to decide which
/// failure to report.
pub async fn start_processing<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    claim: ProcessingClaim,
) -> Result<games::Model, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let lease_stale_before = now - claim.processing_timeout;
    let heartbeat_stale_before = now - claim.heartbeat_timeout;

    let claimable = Condition::any()
        .add(games::Column::ProcessingRequestId.is_null())
        .add(games::Column::ProcessingStartedAt.lt(lease_stale_before))
        .add(games::Column::UpdatedAt.lt(heartbeat_stale_before));

    let mut update = games::Entity::update_many()
        .set(games::ActiveModel {
            processing_request_id: Set(Some(claim.request_id.clone())),
            processing_started_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        })
        .col_expr(
            games::Column::Version,
            Expr::col(games::Column::Version).add(1),
        )
        .filter(games::Column::Id.eq(claim.game_id.as_str()))
        .filter(claimable);
    if let Some(expected_turn) = claim.expected_turn {
        update = update.filter(games::Column::CurrentTurn.eq(expected_turn));
    }

    let result = update.exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(diagnose_refused_claim(conn, &claim).await);
    }

    games::Entity::find_by_id(claim.game_id.as_str())
        .one(conn)
        .await?
        .ok_or_else(|| game_not_found(&claim.game_id))
}

/// Decide which error a refused claim maps to. A turn mismatch outranks a
/// held lease: the caller's request is stale either way, and the turn tells
/// it not to retry.
async fn diagnose_refused_claim<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    claim: &ProcessingClaim,
) -> sea_orm::DbErr {
    let game = match games::Entity::find_by_id(claim.game_id.as_str())
        .one(conn)
        .await
    {
        Ok(Some(game)) => game,
        Ok(None) => return game_not_found(&claim.game_id),
        Err(e) => return e,
    };

    if let Some(expected) = claim.expected_turn {
        if game.current_turn != expected {
            return turn_conflict(expected, game.current_turn);
        }
    }

    match game.processing_request_id {
        Some(holder) => already_processing(&holder),
        // Lease released between our update and this read; the claim still
        // lost, so report it without a holder.
        None => already_processing("unknown"),
    }
}

/// Release the lease iff `request_id` still holds it.
///
/// A zero-row update means the lease was already reclaimed or released;
/// that is an accepted outcome, not an error.
pub async fn finish_processing<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: &str,
    request_id: &str,
) -> Result<(), sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();

    games::Entity::update_many()
        .set(games::ActiveModel {
            processing_request_id: Set(None),
            processing_started_at: Set(None),
            updated_at: Set(now),
            ..Default::default()
        })
        .col_expr(
            games::Column::Version,
            Expr::col(games::Column::Version).add(1),
        )
        .filter(games::Column::Id.eq(game_id))
        .filter(games::Column::ProcessingRequestId.eq(request_id))
        .exec(conn)
        .await?;

    Ok(())
}

/// Update game fields under optimistic locking.
pub async fn update_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: GameUpdate,
) -> Result<games::Model, sea_orm::DbErr> {
    let GameUpdate {
        id,
        expected_version,
        state,
        status,
        current_turn,
        waiting_deadline,
        started_at,
        finished_at,
    } = dto;

    versioned_update_then_fetch(conn, &id, expected_version, move |update| {
        let mut model = games::ActiveModel {
            ..Default::default()
        };
        if let Some(state) = state {
            model.state = Set(state);
        }
        if let Some(status) = status {
            model.status = Set(status);
        }
        if let Some(turn) = current_turn {
            model.current_turn = Set(turn);
        }
        if let Some(deadline) = waiting_deadline {
            model.waiting_deadline = Set(deadline);
        }
        if let Some(at) = started_at {
            model.started_at = Set(Some(at));
        }
        if let Some(at) = finished_at {
            model.finished_at = Set(Some(at));
        }
        update.set(model)
    })
    .await
}

/// WAITING games of one type still open for joins: deadline unexpired or
/// absent, oldest first.
pub async fn find_open_waiting<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_type: GameType,
    now: time::OffsetDateTime,
) -> Result<Vec<games::Model>, sea_orm::DbErr> {
    games::Entity::find()
        .filter(games::Column::Status.eq(MatchmakingStatus::Waiting))
        .filter(games::Column::GameType.eq(game_type))
        .filter(
            Condition::any()
                .add(games::Column::WaitingDeadline.is_null())
                .add(games::Column::WaitingDeadline.gt(now)),
        )
        .order_by(games::Column::CreatedAt, Order::Asc)
        .all(conn)
        .await
}

/// WAITING games whose deadline has passed, any game type, oldest deadline
/// first.
pub async fn find_expired_waiting<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    now: time::OffsetDateTime,
) -> Result<Vec<games::Model>, sea_orm::DbErr> {
    games::Entity::find()
        .filter(games::Column::Status.eq(MatchmakingStatus::Waiting))
        .filter(games::Column::WaitingDeadline.is_not_null())
        .filter(games::Column::WaitingDeadline.lte(now))
        .order_by(games::Column::WaitingDeadline, Order::Asc)
        .all(conn)
        .await
}
