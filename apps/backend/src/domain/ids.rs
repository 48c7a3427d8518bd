use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::errors::domain::{DomainError, ValidationKind};

/// Identifier of a game, a ULID in canonical string form.
///
/// Generated by the application at creation time so that a game id exists
/// before the row does, which lets callers carry it through matchmaking,
/// billing, and logging without a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Parse an id supplied by a caller, rejecting anything that is not a
    /// canonical ULID.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        Ulid::from_string(raw).map_err(|_| {
            DomainError::validation(
                ValidationKind::InvalidGameId,
                format!("'{raw}' is not a valid game id"),
            )
        })?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<GameId> for String {
    fn from(id: GameId) -> Self {
        id.0
    }
}
