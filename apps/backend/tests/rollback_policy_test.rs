//! Integration test for the process-wide rollback policy: once
//! `RollbackOnOk` is set, `with_txn` discards successful work while still
//! returning the closure's value. A suite pointed at one shared database
//! sets this to keep tests from seeing each other's writes.
//!
//! The policy is a process global, so this test lives in its own binary.
//!
//! Run with: cargo test --test rollback_policy_test

mod support;

use std::sync::Arc;

use backend::db::{set_txn_policy, with_txn, TxnPolicy};
use backend::domain::ids::GameId;
use backend::domain::state::GameState;
use backend::repos::games::{self, GameCreate};
use backend::GameType;

use support::agents::BrokenProvider;
use support::build_test_state;
use support::envs::duel_registry;

#[tokio::test]
async fn rollback_policy_discards_successful_work() -> Result<(), Box<dyn std::error::Error>> {
    set_txn_policy(TxnPolicy::RollbackOnOk);

    let state = build_test_state(duel_registry(), Arc::new(BrokenProvider)).await?;
    let game_id = GameId::generate();

    let created = with_txn(&state, |txn| {
        let id = game_id.clone();
        Box::pin(async move {
            let game = games::create_game(
                txn,
                GameCreate::new(id.as_str(), GameType::Chess, GameState::default().to_value()),
            )
            .await?;
            Ok(game)
        })
    })
    .await?;

    // The caller still gets the closure's value; only the writes vanish.
    assert_eq!(created.version, 0);
    assert!(
        games::find_by_id(&state.db, &game_id).await?.is_none(),
        "work must not survive under the rollback policy"
    );
    Ok(())
}
