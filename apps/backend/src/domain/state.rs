use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::domain::{DomainError, InfraErrorKind, ValidationKind};

/// Keys owned by the envelope. Game environments must not shadow these in
/// their own state data; `to_value` drops shadowing entries.
const RESERVED_KEYS: [&str; 3] = ["turn", "current_player_id", "is_finished"];

/// The persisted state of a game: a small typed envelope around an opaque,
/// game-specific JSON object.
///
/// The engine itself only ever reads the envelope fields. Everything else in
/// `data` belongs to the registered game environment and round-trips through
/// the database untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameState {
    /// Monotonic turn counter, starting at the environment's initial value.
    pub turn: i32,
    /// Player expected to act next; `None` once no one is to move.
    pub current_player_id: Option<i64>,
    pub is_finished: bool,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl GameState {
    /// Decode a state blob read back from the database.
    pub fn from_db_value(value: Value) -> Result<Self, DomainError> {
        serde_json::from_value(value).map_err(|e| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!("Stored game state is unreadable: {e}"),
            )
        })
    }

    /// Decode a state blob supplied by a caller (playground custom state).
    pub fn from_client_value(value: Value) -> Result<Self, DomainError> {
        if !value.is_object() {
            return Err(DomainError::validation(
                ValidationKind::InvalidInput,
                "Custom state must be a JSON object",
            ));
        }
        serde_json::from_value(value).map_err(|e| {
            DomainError::validation(
                ValidationKind::InvalidInput,
                format!("Custom state rejected: {e}"),
            )
        })
    }

    /// Encode for persistence. Envelope fields are authoritative; any entry
    /// in `data` that shadows a reserved key is dropped.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("turn".into(), Value::from(self.turn));
        map.insert(
            "current_player_id".into(),
            self.current_player_id.map(Value::from).unwrap_or(Value::Null),
        );
        map.insert("is_finished".into(), Value::Bool(self.is_finished));
        for (key, value) in &self.data {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                map.insert(key.clone(), value.clone());
            }
        }
        Value::Object(map)
    }
}
