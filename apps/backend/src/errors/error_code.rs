//! Error codes for the Gambit backend API.
//!
//! This module defines all error codes used throughout the application.
//! Add new codes here; never pass ad-hoc strings as error codes.
//!
//! All error codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings
//! that appear in HTTP responses.

use core::fmt;

/// Centralized error codes for the Gambit backend API.
///
/// This enum ensures type safety and prevents the use of ad-hoc error codes.
/// Each variant maps to a canonical SCREAMING_SNAKE_CASE string that appears
/// in HTTP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request Validation
    /// Invalid game ID provided
    InvalidGameId,
    /// Request payload failed validation
    InvalidInput,
    /// Move rejected by the game rules
    IllegalMove,
    /// General validation error
    ValidationError,

    // Billing
    /// Entry fee could not be charged
    InsufficientFunds,

    // Resource Not Found
    /// Game not found
    GameNotFound,
    /// Player not found
    PlayerNotFound,
    /// General not found error
    NotFound,

    // Turn Processing Conflicts
    /// Another request holds the processing lease
    AlreadyProcessing,
    /// The game has advanced past the expected turn
    TurnConflict,
    /// Version check failed on a concurrent update
    OptimisticLock,
    /// Game already reached a terminal state
    GameAlreadyFinished,
    /// Acting player is not the player to move
    NotPlayersTurn,
    /// Game already left the waiting phase
    GameAlreadyStarted,
    /// Matchmaking status may only move forward
    InvalidStatusTransition,
    /// Generic conflict (fallback for unmatched conflicts)
    Conflict,

    // Authorization
    /// Access denied
    Forbidden,

    // System Errors
    /// Database error
    DbError,
    /// Database unavailable
    DbUnavailable,
    /// Database timeout (gateway timeout)
    DbTimeout,

    /// Internal server error
    Internal,
    /// Configuration error
    ConfigError,
    /// Data corruption detected
    DataCorruption,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this error code.
    ///
    /// This is the exact string that appears in HTTP responses.
    pub const fn as_str(&self) -> &'static str {
        match self {
            // Request Validation
            Self::InvalidGameId => "INVALID_GAME_ID",
            Self::InvalidInput => "INVALID_INPUT",
            Self::IllegalMove => "ILLEGAL_MOVE",
            Self::ValidationError => "VALIDATION_ERROR",

            // Billing
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",

            // Resource Not Found
            Self::GameNotFound => "GAME_NOT_FOUND",
            Self::PlayerNotFound => "PLAYER_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            // Turn Processing Conflicts
            Self::AlreadyProcessing => "ALREADY_PROCESSING",
            Self::TurnConflict => "TURN_CONFLICT",
            Self::OptimisticLock => "OPTIMISTIC_LOCK",
            Self::GameAlreadyFinished => "GAME_ALREADY_FINISHED",
            Self::NotPlayersTurn => "NOT_PLAYERS_TURN",
            Self::GameAlreadyStarted => "GAME_ALREADY_STARTED",
            Self::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            Self::Conflict => "CONFLICT",

            // Authorization
            Self::Forbidden => "FORBIDDEN",

            // System Errors
            Self::DbError => "DB_ERROR",
            Self::DbUnavailable => "DB_UNAVAILABLE",
            Self::DbTimeout => "DB_TIMEOUT",

            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
            Self::DataCorruption => "DATA_CORRUPTION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
