//! Orchestration services.
//!
//! Services own the transaction boundaries and the processing lease. They
//! talk to the database through the repos layer and to game rules through
//! the engine registry; agent I/O always happens between transactions.

pub mod lifecycle;
pub mod matchmaking;
pub mod turn_flow;

pub use lifecycle::GameLifecycleService;
pub use matchmaking::MatchmakingService;
pub use turn_flow::TurnFlowService;
