use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::processor::TurnRequest;
use super::timeout::timeout_resolution;
use super::TurnFlowService;
use crate::agents::DecisionContext;
use crate::domain::decision::{DecisionAction, ToolCall};
use crate::domain::events::{DecisionSource, EventDraft, StoredEvent};
use crate::domain::results::{ForfeitReason, GameResult};
use crate::domain::state::GameState;
use crate::engine::GameEnv;
use crate::error::AppError;
use crate::errors::domain::DomainError;
use crate::repos::games::Game;
use crate::repos::players::GamePlayer;
use crate::state::AppState;

/// The settled end of a turn, ready to persist.
///
/// `result` is set on paths that computed the outcome themselves (forfeit,
/// timeout); otherwise persist extracts it from the finished state.
#[derive(Debug)]
pub(super) struct TurnResolution {
    pub state: GameState,
    pub events: Vec<EventDraft>,
    pub result: Option<GameResult>,
}

impl TurnFlowService {
    /// Produce the applied next state for this turn, via the override path
    /// or the bounded agent decision loop.
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn resolve_move(
        &self,
        state: &AppState,
        request: &TurnRequest,
        game: &Game,
        env: &dyn GameEnv,
        actor: &GamePlayer,
        seats: &[GamePlayer],
        history: &[StoredEvent],
    ) -> Result<TurnResolution, AppError> {
        // Operator override path: a valid override applies directly; an
        // invalid one is dropped with a log and the agent decides as usual.
        if let Some(override_move) = &request.move_override {
            match self.try_apply(env, &game.state, override_move) {
                Ok((next_state, follow_on)) => {
                    info!(game_id = %game.id, player_id = request.player_id, "applying move override");
                    let mut events = vec![
                        EventDraft::move_played(request.player_id, override_move),
                        EventDraft::reasoning(request.player_id, DecisionSource::Override, None, None),
                    ];
                    events.extend(follow_on);
                    return Ok(TurnResolution {
                        state: next_state,
                        events,
                        result: None,
                    });
                }
                Err(e) => {
                    warn!(game_id = %game.id, error = %e, "ignoring invalid move override");
                }
            }
        }

        let limits = state.limits;
        let deadline = tokio::time::Instant::now() + limits.decision_budget;
        let view = env.player_view(&game.state, request.player_id, history);
        let possible_moves = env.possible_moves(&game.state, request.player_id);

        let mut feedback: Vec<String> = Vec::new();
        let mut events: Vec<EventDraft> = Vec::new();

        for attempt in 1..=limits.max_decision_attempts {
            // The clock keeps running while the agent thinks; re-check it
            // before spending another attempt.
            if env.uses_time_control() && env.time_expired(&game.state, OffsetDateTime::now_utc())
            {
                info!(game_id = %game.id, attempt, "clock expired during the decision loop");
                let resolution = timeout_resolution(env, game, request.player_id)?;
                let mut all = events;
                all.extend(resolution.events);
                return Ok(TurnResolution {
                    events: all,
                    ..resolution
                });
            }

            let ctx = DecisionContext {
                game_id: &game.id,
                game_type: game.game_type,
                player_id: request.player_id,
                agent_version_id: actor.agent_version_id,
                turn: game.state.turn,
                attempt,
                feedback: &feedback,
            };

            let decided = tokio::time::timeout_at(
                deadline,
                state.agents.decide(&ctx, &view, possible_moves.as_ref()),
            )
            .await;

            let decision = match decided {
                Err(_) => {
                    warn!(game_id = %game.id, attempt, "decision budget exhausted");
                    break;
                }
                Ok(Err(e)) => {
                    debug!(game_id = %game.id, attempt, error = %e, "decision attempt failed");
                    feedback.push(e.to_string());
                    continue;
                }
                Ok(Ok(decision)) => decision,
            };

            let classified = match decision.classify() {
                Ok(classified) => classified,
                Err(reason) => {
                    debug!(game_id = %game.id, attempt, reason, "unusable decision");
                    feedback.push(reason);
                    continue;
                }
            };
            if !classified.discarded.is_empty() {
                warn!(
                    game_id = %game.id,
                    attempt,
                    discarded = ?classified.discarded,
                    "decision set multiple actions; keeping the highest-priority one"
                );
            }

            match classified.action {
                DecisionAction::Exit { chat_message } => {
                    info!(game_id = %game.id, player_id = request.player_id, "agent resigned");
                    events.push(EventDraft::chat(request.player_id, &chat_message));
                    events.push(EventDraft::reasoning(
                        request.player_id,
                        DecisionSource::Agent,
                        decision.reasoning.as_deref(),
                        Some(&chat_message),
                    ));
                    return self.forfeit_resolution(
                        env,
                        game,
                        request.player_id,
                        ForfeitReason::Resigned,
                        events,
                        seats,
                    );
                }
                DecisionAction::ToolCall { call } => {
                    debug!(game_id = %game.id, attempt, tool = %call.name, "agent requested a tool");
                    events.push(EventDraft::tool_call(
                        request.player_id,
                        &call.name,
                        &call.arguments,
                    ));
                    feedback.push(tool_feedback(&call, possible_moves.as_ref()));
                    continue;
                }
                DecisionAction::Move { game_move } => {
                    match self.try_apply(env, &game.state, &game_move) {
                        Ok((next_state, follow_on)) => {
                            let mut all = events;
                            all.push(EventDraft::move_played(request.player_id, &game_move));
                            all.push(EventDraft::reasoning(
                                request.player_id,
                                DecisionSource::Agent,
                                decision.reasoning.as_deref(),
                                decision.chat_message.as_deref(),
                            ));
                            all.extend(follow_on);
                            return Ok(TurnResolution {
                                state: next_state,
                                events: all,
                                result: None,
                            });
                        }
                        Err(DomainError::Validation(kind, detail)) => {
                            debug!(game_id = %game.id, attempt, kind = ?kind, "move rejected");
                            feedback.push(detail);
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        // Attempts or wall clock exhausted; fall back or forfeit.
        self.exhausted_resolution(env, game, request.player_id, events, seats)
    }

    /// Apply a move on a scratch copy so a rejection leaves nothing behind.
    pub(super) fn try_apply(
        &self,
        env: &dyn GameEnv,
        state: &GameState,
        game_move: &Value,
    ) -> Result<(GameState, Vec<EventDraft>), DomainError> {
        let mut scratch = state.clone();
        let events = env.apply_move(&mut scratch, game_move)?;
        Ok((scratch, events))
    }

    fn exhausted_resolution(
        &self,
        env: &dyn GameEnv,
        game: &Game,
        player_id: i64,
        mut events: Vec<EventDraft>,
        seats: &[GamePlayer],
    ) -> Result<TurnResolution, AppError> {
        if let Some(fallback) = env.error_fallback_move(&game.state, player_id) {
            match self.try_apply(env, &game.state, &fallback) {
                Ok((next_state, follow_on)) => {
                    info!(game_id = %game.id, player_id, "applying fallback move");
                    events.push(EventDraft::move_played(player_id, &fallback));
                    events.push(EventDraft::reasoning(
                        player_id,
                        DecisionSource::Fallback,
                        None,
                        None,
                    ));
                    events.extend(follow_on);
                    return Ok(TurnResolution {
                        state: next_state,
                        events,
                        result: None,
                    });
                }
                Err(e) => {
                    warn!(game_id = %game.id, player_id, error = %e, "fallback move rejected");
                }
            }
        }
        self.forfeit_resolution(
            env,
            game,
            player_id,
            ForfeitReason::FailedToMove,
            events,
            seats,
        )
    }

    /// Finish the game with everyone but `loser` as winners by forfeit.
    pub(super) fn forfeit_resolution(
        &self,
        env: &dyn GameEnv,
        game: &Game,
        loser: i64,
        reason: ForfeitReason,
        mut events: Vec<EventDraft>,
        seats: &[GamePlayer],
    ) -> Result<TurnResolution, AppError> {
        let remaining: Vec<i64> = seats
            .iter()
            .filter(|p| p.is_active() && p.id != loser)
            .map(|p| p.id)
            .collect();

        let mut scratch = game.state.clone();
        env.finish_due_to_forfeit(&mut scratch, &remaining)?;
        if !scratch.is_finished {
            return Err(AppError::internal(format!(
                "environment left game {} unfinished after forfeit",
                game.id
            )));
        }

        let result = env.extract_game_result(&scratch)?.with_forfeit(reason);
        result.ensure_consistent()?;

        info!(game_id = %game.id, loser, reason = ?reason, "turn ended in forfeit");
        events.push(EventDraft::agent_forfeit(loser, reason));
        events.push(EventDraft::game_finished(&result));

        Ok(TurnResolution {
            state: scratch,
            events,
            result: Some(result),
        })
    }
}

/// Built-in tools available to agents during the decision loop. Everything
/// else comes back as an error string so the agent can correct itself.
fn tool_feedback(call: &ToolCall, possible_moves: Option<&Value>) -> String {
    match call.name.as_str() {
        "possible_moves" | "legal_moves" => match possible_moves {
            Some(moves) => format!("{}: {moves}", call.name),
            None => format!("{}: this game does not enumerate moves", call.name),
        },
        other => format!("{other}: unknown tool"),
    }
}
