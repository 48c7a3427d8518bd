use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::agents::AgentDecisionProvider;
use crate::billing::{TokenLedger, UnmeteredLedger};
use crate::config::processing::ProcessingLimits;
use crate::engine::GameRegistry;
use crate::scoring::{NoopRatingUpdater, RatingUpdater};

/// Application state containing shared resources.
///
/// Built once at process start and passed explicitly into the services;
/// no component reaches for ambient globals. Every worker handling a turn
/// is stateless between calls apart from what lives here.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DatabaseConnection,
    /// Registered game environments and their matchmaking rules.
    pub registry: Arc<GameRegistry>,
    /// Decision provider invoked during turn processing.
    pub agents: Arc<dyn AgentDecisionProvider>,
    /// Rating backend, called fire-and-log after a game finishes.
    pub ratings: Arc<dyn RatingUpdater>,
    /// Token ledger charged on matchmaking joins.
    pub ledger: Arc<dyn TokenLedger>,
    /// Lease timeouts and decision budgets.
    pub limits: ProcessingLimits,
}

impl AppState {
    /// Create a new AppState with no-op rating and billing backends.
    pub fn new(
        db: DatabaseConnection,
        registry: GameRegistry,
        agents: Arc<dyn AgentDecisionProvider>,
    ) -> Self {
        Self {
            db,
            registry: Arc::new(registry),
            agents,
            ratings: Arc::new(NoopRatingUpdater),
            ledger: Arc::new(UnmeteredLedger),
            limits: ProcessingLimits::default(),
        }
    }

    pub fn with_ratings(mut self, ratings: Arc<dyn RatingUpdater>) -> Self {
        self.ratings = ratings;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn TokenLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_limits(mut self, limits: ProcessingLimits) -> Self {
        self.limits = limits;
        self
    }
}
