//! How to register a game type
//!
//! 1) Implement `GameEnv` for your environment in its own module.
//! 2) Build a `MatchRules` describing its matchmaking profile.
//! 3) Call `GameRegistry::register` during startup, before the registry is
//!    handed to `AppState`.
//! 4) Avoid side effects in environment constructors; the registry may be
//!    built in tests many times per process.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::games::GameType;
use crate::errors::domain::{DomainError, ValidationKind};

use super::{GameEnv, MatchRules};

struct RegistryEntry {
    env: Arc<dyn GameEnv>,
    rules: MatchRules,
}

/// Runtime registry mapping each supported [`GameType`] to its environment
/// and matchmaking rules.
///
/// Built once at startup and shared through `AppState`; lookups for a game
/// type that was never registered fail with an `InvalidInput` validation
/// error rather than panicking.
#[derive(Default)]
pub struct GameRegistry {
    entries: HashMap<GameType, RegistryEntry>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an environment under its own `game_type()`, replacing any
    /// previous registration for that type.
    pub fn register(&mut self, env: Arc<dyn GameEnv>, rules: MatchRules) -> &mut Self {
        self.entries
            .insert(env.game_type(), RegistryEntry { env, rules });
        self
    }

    pub fn env(&self, game_type: GameType) -> Result<Arc<dyn GameEnv>, DomainError> {
        self.entries
            .get(&game_type)
            .map(|entry| Arc::clone(&entry.env))
            .ok_or_else(|| unregistered(game_type))
    }

    pub fn rules(&self, game_type: GameType) -> Result<&MatchRules, DomainError> {
        self.entries
            .get(&game_type)
            .map(|entry| &entry.rules)
            .ok_or_else(|| unregistered(game_type))
    }

    pub fn game_types(&self) -> impl Iterator<Item = GameType> + '_ {
        self.entries.keys().copied()
    }
}

fn unregistered(game_type: GameType) -> DomainError {
    DomainError::validation(
        ValidationKind::InvalidInput,
        format!("Game type {game_type} is not registered"),
    )
}
