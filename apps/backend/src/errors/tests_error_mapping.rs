// Unit tests for error mapping - pure domain logic without HTTP or database dependencies
use crate::errors::domain::{
    ConflictKind, DomainError, InfraErrorKind, NotFoundKind, ValidationKind,
};
use crate::{AppError, ErrorCode};

#[test]
fn maps_validation_to_400() {
    let de = DomainError::validation(ValidationKind::InvalidInput, "bad field");
    let app: AppError = de.into();
    assert_eq!(app.code(), ErrorCode::InvalidInput);
    assert_eq!(app.status(), 400);

    let de = DomainError::validation(ValidationKind::IllegalMove, "knight cannot move there");
    let app: AppError = de.into();
    assert_eq!(app.code(), ErrorCode::IllegalMove);
    assert_eq!(app.status(), 400);

    // Fallback kind keeps the generic code
    let de = DomainError::validation(ValidationKind::Other("X".into()), "bad");
    let app: AppError = de.into();
    assert_eq!(app.code(), ErrorCode::ValidationError);
    assert_eq!(app.status(), 400);
}

#[test]
fn maps_insufficient_funds_to_402() {
    let de = DomainError::validation(ValidationKind::InsufficientFunds, "balance 0, fee 100");
    let app: AppError = de.into();
    assert_eq!(app.code(), ErrorCode::InsufficientFunds);
    assert_eq!(app.status(), 402);
}

#[test]
fn maps_conflicts() {
    let lease = DomainError::conflict(ConflictKind::AlreadyProcessing, "lease held");
    let app: AppError = lease.into();
    assert_eq!(app.code().as_str(), "ALREADY_PROCESSING");
    assert_eq!(app.status(), 409);

    let turn = DomainError::conflict(ConflictKind::TurnConflict, "turn advanced");
    let app: AppError = turn.into();
    assert_eq!(app.code().as_str(), "TURN_CONFLICT");
    assert_eq!(app.status(), 409);

    let lock = DomainError::conflict(ConflictKind::OptimisticLock, "stale version");
    let app: AppError = lock.into();
    assert_eq!(app.code().as_str(), "OPTIMISTIC_LOCK");
    assert_eq!(app.status(), 409);

    let finished = DomainError::conflict(ConflictKind::AlreadyFinished, "game over");
    let app: AppError = finished.into();
    assert_eq!(app.code().as_str(), "GAME_ALREADY_FINISHED");
    assert_eq!(app.status(), 409);

    // Test generic conflict fallback
    let other = DomainError::conflict(
        ConflictKind::Other("some conflict".to_string()),
        "generic conflict",
    );
    let app: AppError = other.into();
    assert_eq!(app.code().as_str(), "CONFLICT");
    assert_eq!(app.status(), 409);
}

#[test]
fn maps_not_found() {
    let game = DomainError::not_found(NotFoundKind::Game, "Game 01ABC not found");
    let app: AppError = game.into();
    assert_eq!(app.code(), ErrorCode::GameNotFound);
    assert_eq!(app.status(), 404);

    let player = DomainError::not_found(NotFoundKind::Player, "Player 7 not found");
    let app: AppError = player.into();
    assert_eq!(app.code(), ErrorCode::PlayerNotFound);
    assert_eq!(app.status(), 404);

    let other = DomainError::not_found(NotFoundKind::Other("Record".into()), "gone");
    let app: AppError = other.into();
    assert_eq!(app.code(), ErrorCode::NotFound);
    assert_eq!(app.status(), 404);
}

#[test]
fn maps_infra() {
    let timeout = DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    let app: AppError = timeout.into();
    assert_eq!(app.code(), ErrorCode::DbTimeout);
    assert_eq!(app.status(), 504);

    let unavailable = DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
    let app: AppError = unavailable.into();
    assert_eq!(app.code(), ErrorCode::DbUnavailable);
    assert_eq!(app.status(), 503);

    let corruption = DomainError::infra(InfraErrorKind::DataCorruption, "bad state blob");
    let app: AppError = corruption.into();
    assert_eq!(app.code(), ErrorCode::DataCorruption);
    assert_eq!(app.status(), 500);

    let other = DomainError::infra(InfraErrorKind::Other("DbErr".into()), "db failed");
    let app: AppError = other.into();
    assert_eq!(app.code(), ErrorCode::Internal);
    assert_eq!(app.status(), 500);
}

#[test]
fn only_transient_infra_failures_are_retryable() {
    let retryable = [
        AppError::db(ErrorCode::DbTimeout, "timeout"),
        AppError::db(ErrorCode::DbUnavailable, "down"),
    ];
    for err in retryable {
        assert!(err.retryable(), "{err} should be retryable");
    }

    let fatal = [
        AppError::conflict(ErrorCode::AlreadyProcessing, "lease held"),
        AppError::conflict(ErrorCode::TurnConflict, "turn advanced"),
        AppError::validation(ErrorCode::InvalidInput, "bad"),
        AppError::internal("boom"),
    ];
    for err in fatal {
        assert!(!err.retryable(), "{err} should not be retryable");
    }
}

#[test]
fn problem_details_shape() {
    let app = AppError::conflict(ErrorCode::AlreadyProcessing, "lease held by another request");
    let body = app.problem_details();
    assert_eq!(body.status, 409);
    assert_eq!(body.code, "ALREADY_PROCESSING");
    assert_eq!(body.title, "Already Processing");
    assert_eq!(body.type_, "https://gambit.app/errors/ALREADY_PROCESSING");
    assert_eq!(body.detail, "lease held by another request");
    // Outside any request scope the trace id falls back to a sentinel
    assert_eq!(body.trace_id, "unknown");
}
