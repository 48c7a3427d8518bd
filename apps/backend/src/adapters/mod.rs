//! Adapters for external dependencies.

pub mod events_sea;
pub mod games_sea;
pub mod players_sea;
