//! SeaORM -> DomainError translation helpers.
//!
//! Adapters convert `sea_orm::DbErr` into `crate::errors::domain::DomainError`
//! here, and higher layers then map `DomainError` to `AppError` via `From`.
//!
//! Conditional updates in the adapters cannot carry structured failures
//! through `DbErr` directly, so they encode them as `DbErr::Custom` payloads
//! with a `PREFIX:{json}` shape. This module is the single place that decodes
//! those payloads.

use tracing::{error, warn};

use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind, NotFoundKind};
use crate::trace_ctx;

/// Payload prefix for a game row that disappeared under a conditional update.
pub const PAYLOAD_GAME_NOT_FOUND: &str = "GAME_NOT_FOUND:";
/// Payload prefix for a lease claim that lost to a live holder.
pub const PAYLOAD_ALREADY_PROCESSING: &str = "ALREADY_PROCESSING:";
/// Payload prefix for a lease claim whose expected turn has passed.
pub const PAYLOAD_TURN_CONFLICT: &str = "TURN_CONFLICT:";
/// Payload prefix for a version-gated update that lost a race.
pub const PAYLOAD_OPTIMISTIC_LOCK: &str = "OPTIMISTIC_LOCK:";

#[derive(serde::Serialize, serde::Deserialize)]
pub(crate) struct VersionInfo {
    pub expected: i32,
    pub actual: i32,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub(crate) struct HolderInfo {
    pub holder: String,
}

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

/// Translate a `DbErr` into a `DomainError`.
pub fn map_db_err(e: sea_orm::DbErr) -> DomainError {
    let error_msg = e.to_string();
    let trace_id = trace_ctx::trace_id();

    match &e {
        sea_orm::DbErr::RecordNotFound(_) => {
            return DomainError::not_found(NotFoundKind::Other("Record".into()), "Record not found");
        }
        sea_orm::DbErr::Custom(msg) if msg.starts_with(PAYLOAD_GAME_NOT_FOUND) => {
            let game_id = &msg[PAYLOAD_GAME_NOT_FOUND.len()..];
            warn!(trace_id = %trace_id, game_id, "Game not found");
            return DomainError::not_found(
                NotFoundKind::Game,
                format!("Game {game_id} not found"),
            );
        }
        sea_orm::DbErr::Custom(msg) if msg.starts_with(PAYLOAD_ALREADY_PROCESSING) => {
            let json_str = &msg[PAYLOAD_ALREADY_PROCESSING.len()..];
            if let Ok(info) = serde_json::from_str::<HolderInfo>(json_str) {
                warn!(
                    trace_id = %trace_id,
                    holder = %info.holder,
                    "Processing lease held by another request"
                );
                return DomainError::conflict(
                    ConflictKind::AlreadyProcessing,
                    format!("Game is already being processed by request {}", info.holder),
                );
            }
            warn!(trace_id = %trace_id, "Processing lease held by another request (holder unknown)");
            return DomainError::conflict(
                ConflictKind::AlreadyProcessing,
                "Game is already being processed by another request",
            );
        }
        sea_orm::DbErr::Custom(msg) if msg.starts_with(PAYLOAD_TURN_CONFLICT) => {
            let json_str = &msg[PAYLOAD_TURN_CONFLICT.len()..];
            if let Ok(info) = serde_json::from_str::<VersionInfo>(json_str) {
                warn!(
                    trace_id = %trace_id,
                    expected = info.expected,
                    actual = info.actual,
                    "Turn advancement conflict detected"
                );
                return DomainError::conflict(
                    ConflictKind::TurnConflict,
                    format!(
                        "Game has advanced past turn {} (currently at turn {})",
                        info.expected, info.actual
                    ),
                );
            }
            warn!(trace_id = %trace_id, "Turn advancement conflict detected (turn info unavailable)");
            return DomainError::conflict(
                ConflictKind::TurnConflict,
                "Game has advanced past the expected turn",
            );
        }
        sea_orm::DbErr::Custom(msg) if msg.starts_with(PAYLOAD_OPTIMISTIC_LOCK) => {
            let json_str = &msg[PAYLOAD_OPTIMISTIC_LOCK.len()..];
            if let Ok(info) = serde_json::from_str::<VersionInfo>(json_str) {
                warn!(
                    trace_id = %trace_id,
                    expected = info.expected,
                    actual = info.actual,
                    "Optimistic lock conflict detected"
                );
                return DomainError::conflict(
                    ConflictKind::OptimisticLock,
                    format!(
                        "Game was modified concurrently (expected version {}, actual version {})",
                        info.expected, info.actual
                    ),
                );
            }
            warn!(trace_id = %trace_id, "Optimistic lock conflict detected (version info unavailable)");
            return DomainError::conflict(
                ConflictKind::OptimisticLock,
                "Game was modified by another transaction; re-read and retry",
            );
        }
        sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
            warn!(trace_id = %trace_id, raw_error = %error_msg, "Database unavailable");
            return DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
        }
        _ => {}
    }

    if mentions_sqlstate(&error_msg, "23505")
        || error_msg.contains("duplicate key value violates unique constraint")
        || error_msg.contains("UNIQUE constraint failed")
    {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Unique constraint violation");
        return DomainError::conflict(
            ConflictKind::Other("Unique".into()),
            "Unique constraint violation",
        );
    }

    if mentions_sqlstate(&error_msg, "23503") {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Foreign key constraint violation");
        return DomainError::validation_other("Foreign key constraint violation");
    }

    if mentions_sqlstate(&error_msg, "23514") {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Check constraint violation");
        return DomainError::validation_other("Check constraint violation");
    }

    if error_msg.contains("timeout")
        || error_msg.contains("pool")
        || error_msg.contains("unavailable")
    {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Database timeout or pool issue");
        return DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    }

    error!(trace_id = %trace_id, raw_error = %error_msg, "Unhandled database error");
    DomainError::infra(
        InfraErrorKind::Other("DbErr".into()),
        "Database operation failed",
    )
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        map_db_err(e)
    }
}
