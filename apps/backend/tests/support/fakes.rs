//! Recording and failing doubles for the rating and billing ports.

use std::sync::Mutex;

use async_trait::async_trait;

use backend::billing::{LedgerError, TokenLedger};
use backend::domain::ids::GameId;
use backend::domain::results::GameResult;
use backend::entities::games::GameType;
use backend::scoring::{PlayerAgent, RatingError, RatingUpdater};

/// One recorded rating call.
pub struct RatingCall {
    pub game_id: GameId,
    pub game_type: GameType,
    pub players: Vec<PlayerAgent>,
    pub result: GameResult,
}

/// Rating backend that records every call and succeeds.
#[derive(Default)]
pub struct RecordingRater {
    pub calls: Mutex<Vec<RatingCall>>,
}

#[async_trait]
impl RatingUpdater for RecordingRater {
    async fn update_ratings_after_game(
        &self,
        game_id: &GameId,
        game_type: GameType,
        players: &[PlayerAgent],
        result: &GameResult,
    ) -> Result<(), RatingError> {
        self.calls.lock().unwrap().push(RatingCall {
            game_id: game_id.clone(),
            game_type,
            players: players.to_vec(),
            result: result.clone(),
        });
        Ok(())
    }
}

/// Rating backend that always fails. The services must shrug it off.
pub struct FailingRater;

#[async_trait]
impl RatingUpdater for FailingRater {
    async fn update_ratings_after_game(
        &self,
        _game_id: &GameId,
        _game_type: GameType,
        _players: &[PlayerAgent],
        _result: &GameResult,
    ) -> Result<(), RatingError> {
        Err(RatingError("rating backend down".into()))
    }
}

/// Ledger that accepts every charge and records it.
#[derive(Default)]
pub struct RecordingLedger {
    /// One `(user_id, game_type, amount)` entry per accepted charge.
    pub charges: Mutex<Vec<(i64, GameType, i64)>>,
}

#[async_trait]
impl TokenLedger for RecordingLedger {
    async fn charge_entry_fee(
        &self,
        user_id: i64,
        game_type: GameType,
        amount: i64,
    ) -> Result<(), LedgerError> {
        self.charges.lock().unwrap().push((user_id, game_type, amount));
        Ok(())
    }
}

/// Ledger that refuses every charge for lack of funds.
pub struct BrokeLedger;

#[async_trait]
impl TokenLedger for BrokeLedger {
    async fn charge_entry_fee(
        &self,
        user_id: i64,
        _game_type: GameType,
        _amount: i64,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::InsufficientFunds(format!(
            "user {user_id} has a zero balance"
        )))
    }
}
