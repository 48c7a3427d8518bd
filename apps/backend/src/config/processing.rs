use std::env;

use crate::error::AppError;

/// Tunables for the turn-processing lease and decision loop.
///
/// The two timeout fields drive stale-lease takeover: a lease is considered
/// abandoned once its `processing_started_at` is older than
/// `processing_timeout`, or once the row's `updated_at` heartbeat is older
/// than `heartbeat_timeout`.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingLimits {
    /// Maximum age of a held lease before another request may take it over.
    pub processing_timeout: time::Duration,
    /// Maximum heartbeat silence before a held lease is treated as dead.
    pub heartbeat_timeout: time::Duration,
    /// Decision attempts granted to an agent within a single turn.
    pub max_decision_attempts: u32,
    /// Wall-clock budget for the whole decision loop of one turn.
    pub decision_budget: std::time::Duration,
}

impl Default for ProcessingLimits {
    fn default() -> Self {
        Self {
            processing_timeout: time::Duration::minutes(4),
            heartbeat_timeout: time::Duration::minutes(3),
            max_decision_attempts: 10,
            decision_budget: std::time::Duration::from_secs(300),
        }
    }
}

impl ProcessingLimits {
    /// Build limits from the environment, falling back to defaults for any
    /// unset variable. A set-but-unparsable variable is a config error.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            processing_timeout: time::Duration::seconds(env_secs(
                "GAME_PROCESSING_TIMEOUT_SECS",
                defaults.processing_timeout.whole_seconds(),
            )?),
            heartbeat_timeout: time::Duration::seconds(env_secs(
                "GAME_HEARTBEAT_TIMEOUT_SECS",
                defaults.heartbeat_timeout.whole_seconds(),
            )?),
            max_decision_attempts: env_u32(
                "GAME_MAX_DECISION_ATTEMPTS",
                defaults.max_decision_attempts,
            )?,
            decision_budget: std::time::Duration::from_secs(env_secs(
                "GAME_DECISION_BUDGET_SECS",
                defaults.decision_budget.as_secs() as i64,
            )? as u64),
        })
    }
}

fn env_secs(name: &str, default: i64) -> Result<i64, AppError> {
    match env::var(name) {
        Ok(raw) => raw.parse::<i64>().ok().filter(|v| *v > 0).ok_or_else(|| {
            AppError::config(format!(
                "'{name}' must be a positive number of seconds, got '{raw}'"
            ))
        }),
        Err(_) => Ok(default),
    }
}

fn env_u32(name: &str, default: u32) -> Result<u32, AppError> {
    match env::var(name) {
        Ok(raw) => raw.parse::<u32>().ok().filter(|v| *v > 0).ok_or_else(|| {
            AppError::config(format!("'{name}' must be a positive integer, got '{raw}'"))
        }),
        Err(_) => Ok(default),
    }
}
