//! Pure domain types shared by services, repos, and game environments.
//!
//! Nothing in this module touches the database or the network.

pub mod decision;
pub mod events;
pub mod ids;
pub mod results;
pub mod state;

pub use decision::{AgentDecision, DecisionAction, DecisionError, ToolCall};
pub use events::{DecisionSource, EventDraft, StoredEvent};
pub use ids::GameId;
pub use results::{ForfeitReason, GameResult};
pub use state::GameState;
