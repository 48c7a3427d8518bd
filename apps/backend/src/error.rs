//! Application error type and its RFC 7807 wire shape.
//!
//! `AppError` is what service entry points return. Lower layers produce
//! `DomainError` values and convert via `From<DomainError>`; embedding
//! servers render `problem_details()` as `application/problem+json`.

use serde::Serialize;
use thiserror::Error;

use crate::errors::domain::{
    ConflictKind, DomainError, InfraErrorKind, NotFoundKind, ValidationKind,
};
use crate::errors::ErrorCode;
use crate::infra::db_errors::map_db_err;
use crate::trace_ctx;

#[derive(Debug, Clone, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
    pub trace_id: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {detail}")]
    Validation { code: ErrorCode, detail: String },
    #[error("Conflict: {detail}")]
    Conflict { code: ErrorCode, detail: String },
    #[error("Not found: {detail}")]
    NotFound { code: ErrorCode, detail: String },
    #[error("Payment required: {detail}")]
    PaymentRequired { detail: String },
    #[error("Forbidden: {detail}")]
    Forbidden { detail: String },
    #[error("Database error: {detail}")]
    Db { code: ErrorCode, detail: String },
    #[error("Internal error: {detail}")]
    Internal { detail: String },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
}

impl AppError {
    /// The canonical error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { code, .. } => *code,
            AppError::Conflict { code, .. } => *code,
            AppError::NotFound { code, .. } => *code,
            AppError::PaymentRequired { .. } => ErrorCode::InsufficientFunds,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::Db { code, .. } => *code,
            AppError::Internal { .. } => ErrorCode::Internal,
            AppError::Config { .. } => ErrorCode::ConfigError,
        }
    }

    /// Human-readable detail for this error.
    pub fn detail(&self) -> &str {
        match self {
            AppError::Validation { detail, .. }
            | AppError::Conflict { detail, .. }
            | AppError::NotFound { detail, .. }
            | AppError::PaymentRequired { detail }
            | AppError::Forbidden { detail }
            | AppError::Db { detail, .. }
            | AppError::Internal { detail }
            | AppError::Config { detail } => detail,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::PaymentRequired { .. } => 402,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Db { code, .. } => match code {
                ErrorCode::DbUnavailable => 503,
                ErrorCode::DbTimeout => 504,
                _ => 500,
            },
            AppError::Internal { .. } => 500,
            AppError::Config { .. } => 500,
        }
    }

    /// Whether a caller may reasonably retry the failed request as-is.
    ///
    /// Concurrency conflicts are deliberately non-retryable: the losing
    /// request must re-read game state before acting again. Only transient
    /// infrastructure failures qualify.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            AppError::Db {
                code: ErrorCode::DbUnavailable | ErrorCode::DbTimeout,
                ..
            }
        )
    }

    pub fn validation(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Validation {
            code,
            detail: detail.into(),
        }
    }

    pub fn conflict(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            detail: detail.into(),
        }
    }

    pub fn not_found(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            detail: detail.into(),
        }
    }

    pub fn payment_required(detail: impl Into<String>) -> Self {
        Self::PaymentRequired {
            detail: detail.into(),
        }
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden {
            detail: detail.into(),
        }
    }

    pub fn db(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Db {
            code,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Build the RFC 7807 body for this error, stamped with the current
    /// trace id.
    pub fn problem_details(&self) -> ProblemDetails {
        let code = self.code().as_str();
        ProblemDetails {
            type_: format!("https://gambit.app/errors/{code}"),
            title: Self::humanize_code(code),
            status: self.status(),
            detail: self.detail().to_string(),
            code: code.to_string(),
            trace_id: trace_ctx::trace_id(),
        }
    }

    fn humanize_code(code: &str) -> String {
        code.split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(ValidationKind::InsufficientFunds, detail) => {
                AppError::PaymentRequired { detail }
            }
            DomainError::Validation(kind, detail) => {
                let code = match kind {
                    ValidationKind::InvalidGameId => ErrorCode::InvalidGameId,
                    ValidationKind::InvalidInput => ErrorCode::InvalidInput,
                    ValidationKind::IllegalMove => ErrorCode::IllegalMove,
                    _ => ErrorCode::ValidationError,
                };
                AppError::Validation { code, detail }
            }
            DomainError::Conflict(kind, detail) => {
                let code = match kind {
                    ConflictKind::AlreadyProcessing => ErrorCode::AlreadyProcessing,
                    ConflictKind::TurnConflict => ErrorCode::TurnConflict,
                    ConflictKind::OptimisticLock => ErrorCode::OptimisticLock,
                    ConflictKind::AlreadyFinished => ErrorCode::GameAlreadyFinished,
                    ConflictKind::NotPlayersTurn => ErrorCode::NotPlayersTurn,
                    ConflictKind::GameAlreadyStarted => ErrorCode::GameAlreadyStarted,
                    ConflictKind::StatusTransition => ErrorCode::InvalidStatusTransition,
                    _ => ErrorCode::Conflict,
                };
                AppError::Conflict { code, detail }
            }
            DomainError::NotFound(kind, detail) => {
                let code = match kind {
                    NotFoundKind::Game => ErrorCode::GameNotFound,
                    NotFoundKind::Player => ErrorCode::PlayerNotFound,
                    _ => ErrorCode::NotFound,
                };
                AppError::NotFound { code, detail }
            }
            DomainError::Infra(kind, detail) => match kind {
                InfraErrorKind::Timeout => AppError::Db {
                    code: ErrorCode::DbTimeout,
                    detail,
                },
                InfraErrorKind::DbUnavailable => AppError::Db {
                    code: ErrorCode::DbUnavailable,
                    detail,
                },
                InfraErrorKind::DataCorruption => AppError::Db {
                    code: ErrorCode::DataCorruption,
                    detail,
                },
                _ => AppError::Internal { detail },
            },
        }
    }
}

impl From<std::env::VarError> for AppError {
    fn from(e: std::env::VarError) -> Self {
        AppError::internal(format!("env var error: {e}"))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::from(map_db_err(e))
    }
}
