#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod adapters;
pub mod agents;
pub mod billing;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod entities;
pub mod error;
pub mod errors;
pub mod infra;
pub mod repos;
pub mod scoring;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod trace_ctx;

#[cfg(test)]
pub mod test_bootstrap;

// Re-exports for public API
pub use agents::{AgentDecisionProvider, DecisionContext};
pub use billing::TokenLedger;
pub use config::db::{db_url, DbProfile};
pub use config::processing::ProcessingLimits;
pub use domain::ids::GameId;
pub use engine::{FallbackAgent, GameEnv, GameRegistry, MatchRules};
pub use entities::games::{GameType, MatchmakingStatus};
pub use error::AppError;
pub use errors::{DomainError, ErrorCode};
pub use infra::db::connect_db;
pub use scoring::RatingUpdater;
pub use services::matchmaking::{JoinOutcome, JoinRequest, SweepAction};
pub use services::turn_flow::{TurnOutcome, TurnRequest};
pub use services::{GameLifecycleService, MatchmakingService, TurnFlowService};
pub use state::app_state::AppState;
pub use telemetry::init_tracing;

// Prelude for test convenience
pub mod prelude {
    pub use super::config::db::*;
    pub use super::domain::*;
    pub use super::engine::*;
    pub use super::error::*;
    pub use super::errors::*;
    pub use super::infra::*;
    pub use super::services::*;
    pub use super::state::*;
}

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
