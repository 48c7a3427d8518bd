//! Integration tests for the bounded agent decision loop.
//!
//! The loop grants an agent a fixed number of attempts and a wall-clock
//! budget, feeds rejection details back between attempts, answers tool
//! calls, and settles the turn with a fallback move or a forfeit when the
//! agent cannot produce a legal move.
//!
//! Run with: cargo test --test decision_loop_test

mod support;

use std::sync::Arc;

use serde_json::json;

use backend::config::processing::ProcessingLimits;
use backend::domain::decision::{AgentDecision, DecisionError};
use backend::domain::events::event_type;
use backend::domain::results::ForfeitReason;
use backend::repos::{events, players};
use backend::services::turn_flow::{TurnOutcome, TurnRequest};
use backend::services::TurnFlowService;
use backend::{GameType, MatchmakingStatus};

use support::agents::{exit_decision, plain_move, tool_decision, BrokenProvider, ScriptedProvider, StalledProvider};
use support::build_test_state;
use support::envs::{duel_registry, table_registry};
use support::factory::{event_log, fetch_game, start_counter_game, start_duel};

fn short_limits(attempts: u32) -> ProcessingLimits {
    ProcessingLimits {
        max_decision_attempts: attempts,
        ..ProcessingLimits::default()
    }
}

fn types(log: &[String]) -> Vec<&str> {
    log.iter().map(String::as_str).collect()
}

#[tokio::test]
async fn rejected_moves_feed_the_error_back_to_the_agent(
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(ScriptedProvider::of_moves([
        json!({ "add": 99 }),
        json!({ "add": 2 }),
    ]));
    let state = build_test_state(duel_registry(), provider.clone()).await?;
    let (game, seats) = start_duel(&state).await?;

    let outcome = TurnFlowService::new()
        .process_turn(
            &state,
            TurnRequest::new("req-1", game.id.clone(), seats[0].id, 0),
        )
        .await?;

    assert!(matches!(outcome, TurnOutcome::Continued { turn: 1, .. }));
    let seen = provider.seen_feedback.lock().unwrap();
    assert_eq!(seen.len(), 2, "two attempts were made");
    assert!(seen[0].is_empty(), "first attempt starts clean");
    assert_eq!(seen[1], vec!["can only add 1 to 3, got 99".to_string()]);
    drop(seen);

    // The rejected attempt leaves no trace in the log.
    let log = event_log(&state, &game.id).await?;
    let moves = log.iter().filter(|t| *t == event_type::MOVE_PLAYED).count();
    assert_eq!(moves, 1);
    Ok(())
}

#[tokio::test]
async fn provider_errors_only_consume_attempts() -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(ScriptedProvider::new([
        Err(DecisionError::Provider("llm 500".into())),
        Ok(plain_move(json!({ "add": 1 }))),
    ]));
    let state = build_test_state(duel_registry(), provider.clone()).await?;
    let (game, seats) = start_duel(&state).await?;

    let outcome = TurnFlowService::new()
        .process_turn(
            &state,
            TurnRequest::new("req-1", game.id.clone(), seats[0].id, 0),
        )
        .await?;

    assert!(matches!(outcome, TurnOutcome::Continued { .. }));
    let seen = provider.seen_feedback.lock().unwrap();
    assert_eq!(seen[1], vec!["provider error: llm 500".to_string()]);
    Ok(())
}

#[tokio::test]
async fn empty_decisions_are_reported_and_retried() -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(ScriptedProvider::new([
        Ok(AgentDecision::default()),
        Ok(plain_move(json!({ "add": 1 }))),
    ]));
    let state = build_test_state(duel_registry(), provider.clone()).await?;
    let (game, seats) = start_duel(&state).await?;

    let outcome = TurnFlowService::new()
        .process_turn(
            &state,
            TurnRequest::new("req-1", game.id.clone(), seats[0].id, 0),
        )
        .await?;

    assert!(matches!(outcome, TurnOutcome::Continued { .. }));
    let seen = provider.seen_feedback.lock().unwrap();
    assert_eq!(
        seen[1],
        vec!["decision contained no move, tool_call, or exit".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn tool_call_answers_with_the_move_list_and_is_recorded(
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(ScriptedProvider::new([
        Ok(tool_decision("possible_moves")),
        Ok(plain_move(json!({ "add": 1 }))),
    ]));
    let state = build_test_state(duel_registry(), provider.clone()).await?;
    let (game, seats) = start_duel(&state).await?;

    let outcome = TurnFlowService::new()
        .process_turn(
            &state,
            TurnRequest::new("req-1", game.id.clone(), seats[0].id, 0),
        )
        .await?;
    assert!(matches!(outcome, TurnOutcome::Continued { .. }));

    let expected = format!(
        "possible_moves: {}",
        json!([{ "add": 1 }, { "add": 2 }, { "add": 3 }])
    );
    let seen = provider.seen_feedback.lock().unwrap();
    assert_eq!(seen[1], vec![expected]);
    drop(seen);

    // The tool call is part of the turn's record.
    let stored = events::find_all_by_game(&state.db, &game.id).await?;
    let tool = stored
        .iter()
        .find(|e| e.event_type == event_type::TOOL_CALL)
        .expect("tool call recorded");
    assert_eq!(tool.payload["name"], json!("possible_moves"));
    assert_eq!(tool.payload["player_id"], json!(seats[0].id));

    let log = event_log(&state, &game.id).await?;
    let log = types(&log);
    assert_eq!(
        &log[log.len() - 3..],
        &[
            event_type::TOOL_CALL,
            event_type::MOVE_PLAYED,
            event_type::REASONING
        ]
    );
    Ok(())
}

#[tokio::test]
async fn unknown_tool_comes_back_as_an_error_string() -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(ScriptedProvider::new([
        Ok(tool_decision("crystal_ball")),
        Ok(plain_move(json!({ "add": 1 }))),
    ]));
    let state = build_test_state(duel_registry(), provider.clone()).await?;
    let (game, seats) = start_duel(&state).await?;

    TurnFlowService::new()
        .process_turn(
            &state,
            TurnRequest::new("req-1", game.id.clone(), seats[0].id, 0),
        )
        .await?;

    let seen = provider.seen_feedback.lock().unwrap();
    assert_eq!(seen[1], vec!["crystal_ball: unknown tool".to_string()]);
    Ok(())
}

#[tokio::test]
async fn exhausted_attempts_forfeit_when_no_fallback_exists(
) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state(duel_registry(), Arc::new(BrokenProvider))
        .await?
        .with_limits(short_limits(3));
    let (game, seats) = start_duel(&state).await?;
    let (p1, p2) = (seats[0].id, seats[1].id);

    let outcome = TurnFlowService::new()
        .process_turn(&state, TurnRequest::new("req-1", game.id.clone(), p1, 0))
        .await?;

    let TurnOutcome::Finished { result, .. } = outcome else {
        panic!("a duel with no fallback move must end in forfeit");
    };
    assert_eq!(result.forfeit_reason, Some(ForfeitReason::FailedToMove));
    assert_eq!(result.winner_ids, vec![p2]);

    let log = event_log(&state, &game.id).await?;
    let forfeits = log.iter().filter(|t| *t == event_type::AGENT_FORFEIT).count();
    let finishes = log.iter().filter(|t| *t == event_type::GAME_FINISHED).count();
    assert_eq!((forfeits, finishes), (1, 1));

    let stored = events::find_all_by_game(&state.db, &game.id).await?;
    let forfeit = stored
        .iter()
        .find(|e| e.event_type == event_type::AGENT_FORFEIT)
        .expect("forfeit recorded");
    assert_eq!(forfeit.payload["player_id"], json!(p1));
    assert_eq!(forfeit.payload["reason"], json!("FAILED_TO_MOVE"));

    let reloaded = fetch_game(&state, &game.id).await?;
    assert_eq!(reloaded.status, MatchmakingStatus::Finished);
    assert!(reloaded.state.is_finished);
    Ok(())
}

#[tokio::test]
async fn exhausted_attempts_play_the_fallback_move_when_offered(
) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state(table_registry(), Arc::new(BrokenProvider))
        .await?
        .with_limits(short_limits(2));
    let (game, seats) = start_counter_game(&state, GameType::TexasHoldem, &[1, 2]).await?;

    let outcome = TurnFlowService::new()
        .process_turn(
            &state,
            TurnRequest::new("req-1", game.id.clone(), seats[0].id, 0),
        )
        .await?;

    assert!(
        matches!(outcome, TurnOutcome::Continued { turn: 1, .. }),
        "the fallback move keeps the game going"
    );

    let stored = events::find_all_by_game(&state.db, &game.id).await?;
    let reasoning = stored
        .iter()
        .find(|e| e.event_type == event_type::REASONING)
        .expect("reasoning event recorded");
    assert_eq!(reasoning.payload["source"], json!("FALLBACK"));

    let reloaded = fetch_game(&state, &game.id).await?;
    assert_eq!(
        reloaded.state.data["scores"][seats[0].id.to_string()],
        json!(1),
        "the configured fallback adds 1"
    );
    Ok(())
}

#[tokio::test]
async fn resignation_finishes_with_chat_and_forfeit() -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(ScriptedProvider::new([Ok(exit_decision("gg wp"))]));
    let state = build_test_state(duel_registry(), provider).await?;
    let (game, seats) = start_duel(&state).await?;
    let (p1, p2) = (seats[0].id, seats[1].id);

    let outcome = TurnFlowService::new()
        .process_turn(&state, TurnRequest::new("req-1", game.id.clone(), p1, 0))
        .await?;

    let TurnOutcome::Finished { result, .. } = outcome else {
        panic!("resignation must finish the game");
    };
    assert_eq!(result.forfeit_reason, Some(ForfeitReason::Resigned));
    assert_eq!(result.winner_ids, vec![p2]);

    let log = event_log(&state, &game.id).await?;
    let log = types(&log);
    assert_eq!(
        &log[log.len() - 4..],
        &[
            event_type::CHAT,
            event_type::REASONING,
            event_type::AGENT_FORFEIT,
            event_type::GAME_FINISHED
        ]
    );

    let stored = events::find_all_by_game(&state.db, &game.id).await?;
    let chat = stored
        .iter()
        .find(|e| e.event_type == event_type::CHAT)
        .expect("chat recorded");
    assert_eq!(chat.payload["message"], json!("gg wp"));
    let reasoning = stored
        .iter()
        .find(|e| e.event_type == event_type::REASONING)
        .expect("reasoning recorded");
    assert_eq!(reasoning.payload["chat_message"], json!("gg wp"));
    Ok(())
}

#[tokio::test]
async fn multi_action_decision_keeps_the_highest_priority(
) -> Result<(), Box<dyn std::error::Error>> {
    // exit outranks the move; the move must be discarded, not played.
    let decision = AgentDecision {
        exit: true,
        chat_message: Some("conceding".into()),
        game_move: Some(json!({ "add": 1 })),
        ..AgentDecision::default()
    };
    let provider = Arc::new(ScriptedProvider::new([Ok(decision)]));
    let state = build_test_state(duel_registry(), provider).await?;
    let (game, seats) = start_duel(&state).await?;

    let outcome = TurnFlowService::new()
        .process_turn(
            &state,
            TurnRequest::new("req-1", game.id.clone(), seats[0].id, 0),
        )
        .await?;

    let TurnOutcome::Finished { result, .. } = outcome else {
        panic!("exit must win over the bundled move");
    };
    assert_eq!(result.forfeit_reason, Some(ForfeitReason::Resigned));

    let log = event_log(&state, &game.id).await?;
    assert!(
        !log.iter().any(|t| t == event_type::MOVE_PLAYED),
        "the bundled move must not be played"
    );
    Ok(())
}

#[tokio::test]
async fn decision_budget_cuts_off_a_stalled_provider() -> Result<(), Box<dyn std::error::Error>>
{
    let limits = ProcessingLimits {
        decision_budget: std::time::Duration::from_millis(50),
        ..ProcessingLimits::default()
    };
    let state = build_test_state(duel_registry(), Arc::new(StalledProvider))
        .await?
        .with_limits(limits);
    let (game, seats) = start_duel(&state).await?;
    let (p1, p2) = (seats[0].id, seats[1].id);

    let outcome = TurnFlowService::new()
        .process_turn(&state, TurnRequest::new("req-1", game.id.clone(), p1, 0))
        .await?;

    let TurnOutcome::Finished { result, .. } = outcome else {
        panic!("budget exhaustion in a duel must forfeit");
    };
    assert_eq!(result.forfeit_reason, Some(ForfeitReason::FailedToMove));
    assert_eq!(result.winner_ids, vec![p2]);

    let reloaded = fetch_game(&state, &game.id).await?;
    assert!(!reloaded.has_lease(), "the lease is released after the forfeit");
    Ok(())
}
