//! Token charges for matchmaking entry fees.
//!
//! Charging happens after a successful join and is compensated by leaving
//! the game again if it fails; the ledger itself never sees game state.

use async_trait::async_trait;
use tracing::debug;

use crate::entities::games::GameType;

/// Failure reported by the token ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The user cannot cover the entry fee.
    InsufficientFunds(String),
    /// The ledger backend is unreachable.
    Unavailable(String),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::InsufficientFunds(msg) => write!(f, "insufficient funds: {msg}"),
            LedgerError::Unavailable(msg) => write!(f, "ledger unavailable: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Trait for token ledgers.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Charge `amount` tokens from `user_id` for entering a game.
    async fn charge_entry_fee(
        &self,
        user_id: i64,
        game_type: GameType,
        amount: i64,
    ) -> Result<(), LedgerError>;
}

/// Ledger that charges nothing. The default wiring for free game types and
/// tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmeteredLedger;

#[async_trait]
impl TokenLedger for UnmeteredLedger {
    async fn charge_entry_fee(
        &self,
        user_id: i64,
        game_type: GameType,
        amount: i64,
    ) -> Result<(), LedgerError> {
        debug!(user_id, game_type = %game_type, amount, "unmetered ledger, charge skipped");
        Ok(())
    }
}
