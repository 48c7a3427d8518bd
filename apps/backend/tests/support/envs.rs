//! A deterministic game environment for exercising the services.
//!
//! `CounterEnv` is a race to a target score: on their turn a player adds
//! 1..=3 to their own score, and the first to reach the target wins. The
//! shape is deliberately trivial so every engine hook is observable
//! through plain JSON, while the configuration knobs let one environment
//! stand in for both the duel-style and table-style game types.

use std::sync::Arc;

use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};

use backend::domain::events::{EventDraft, StoredEvent};
use backend::domain::ids::GameId;
use backend::domain::results::GameResult;
use backend::domain::state::GameState;
use backend::engine::{
    FallbackAgent, GameEnv, GameRegistry, MatchRules, PlayerLeftOutcome, SeatedPlayer,
};
use backend::entities::games::GameType;
use backend::errors::domain::{DomainError, ValidationKind};

/// Default winning score; overridable through the `target` state key.
pub const TARGET: i64 = 10;

pub struct CounterEnv {
    game_type: GameType,
    fallback_move: bool,
    time_control: bool,
    on_left: PlayerLeftOutcome,
    reverse_start_order: bool,
}

impl CounterEnv {
    pub fn new(game_type: GameType) -> Self {
        Self {
            game_type,
            fallback_move: false,
            time_control: false,
            on_left: PlayerLeftOutcome::Finish,
            reverse_start_order: false,
        }
    }

    /// Offer `{"add": 1}` as the safe move when an agent fails its turn.
    pub fn with_fallback_move(mut self) -> Self {
        self.fallback_move = true;
        self
    }

    /// Run per-player clocks. The clock only ever expires when a test sets
    /// the `clock_expired` state key.
    pub fn with_time_control(mut self) -> Self {
        self.time_control = true;
        self
    }

    /// Keep the game running after a mid-game departure.
    pub fn continuing_on_departure(mut self) -> Self {
        self.on_left = PlayerLeftOutcome::Continue;
        self
    }

    /// Seat players in reverse of the caller's order at game start.
    pub fn with_reversed_start_order(mut self) -> Self {
        self.reverse_start_order = true;
        self
    }
}

fn seat_order(state: &GameState) -> Vec<i64> {
    state
        .data
        .get("order")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}

fn set_seat_order(state: &mut GameState, order: &[i64]) {
    state.data.insert("order".into(), json!(order));
}

fn score_of(state: &GameState, player_id: i64) -> i64 {
    state
        .data
        .get("scores")
        .and_then(|s| s.get(player_id.to_string()))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

fn set_score(state: &mut GameState, player_id: i64, score: i64) {
    let scores = state
        .data
        .entry("scores")
        .or_insert_with(|| json!({}));
    if let Some(map) = scores.as_object_mut() {
        map.insert(player_id.to_string(), json!(score));
    }
}

fn finish_with_winners(state: &mut GameState, winners: &[i64]) {
    state.is_finished = true;
    state.current_player_id = None;
    state.data.insert("winners".into(), json!(winners));
}

impl GameEnv for CounterEnv {
    fn game_type(&self) -> GameType {
        self.game_type
    }

    fn new_game(&self, _game_id: &GameId) -> Result<(GameState, Vec<EventDraft>), DomainError> {
        let mut state = GameState::default();
        state.data.insert("scores".into(), json!({}));
        state.data.insert("order".into(), json!([]));
        state.data.insert("target".into(), json!(TARGET));
        Ok((state, Vec::new()))
    }

    fn join_player(
        &self,
        state: &mut GameState,
        player: &SeatedPlayer,
    ) -> Result<(), DomainError> {
        let mut seats = seat_order(state);
        seats.push(player.player_id);
        set_seat_order(state, &seats);
        set_score(state, player.player_id, 0);
        Ok(())
    }

    fn new_round(&self, state: &mut GameState) -> Result<(), DomainError> {
        let seats = seat_order(state);
        let Some(first) = seats.first() else {
            return Err(DomainError::validation(
                ValidationKind::InvalidInput,
                "counter game cannot start with no seats",
            ));
        };
        state.current_player_id = Some(*first);
        Ok(())
    }

    fn apply_move(
        &self,
        state: &mut GameState,
        game_move: &Value,
    ) -> Result<Vec<EventDraft>, DomainError> {
        let add = game_move.get("add").and_then(Value::as_i64).ok_or_else(|| {
            DomainError::validation(
                ValidationKind::IllegalMove,
                "move must be an object with an integer 'add' field",
            )
        })?;
        if !(1..=3).contains(&add) {
            return Err(DomainError::validation(
                ValidationKind::IllegalMove,
                format!("can only add 1 to 3, got {add}"),
            ));
        }
        let Some(player_id) = state.current_player_id else {
            return Err(DomainError::validation(
                ValidationKind::IllegalMove,
                "no player is to move",
            ));
        };

        let next_score = score_of(state, player_id) + add;
        set_score(state, player_id, next_score);
        state.turn += 1;

        let target = state
            .data
            .get("target")
            .and_then(Value::as_i64)
            .unwrap_or(TARGET);
        if next_score >= target {
            finish_with_winners(state, &[player_id]);
            let result = self.extract_game_result(state)?;
            return Ok(vec![EventDraft::game_finished(&result)]);
        }

        let seats = seat_order(state);
        let pos = seats.iter().position(|id| *id == player_id).unwrap_or(0);
        state.current_player_id = Some(seats[(pos + 1) % seats.len()]);
        Ok(Vec::new())
    }

    fn possible_moves(&self, _state: &GameState, _player_id: i64) -> Option<Value> {
        Some(json!([{ "add": 1 }, { "add": 2 }, { "add": 3 }]))
    }

    fn player_view(&self, state: &GameState, player_id: i64, events: &[StoredEvent]) -> Value {
        json!({
            "you": player_id,
            "turn": state.turn,
            "scores": state.data.get("scores").cloned().unwrap_or_else(|| json!({})),
            "events_seen": events.len(),
        })
    }

    fn error_fallback_move(&self, _state: &GameState, _player_id: i64) -> Option<Value> {
        self.fallback_move.then(|| json!({ "add": 1 }))
    }

    fn on_player_left(
        &self,
        state: &mut GameState,
        player_id: i64,
    ) -> Result<PlayerLeftOutcome, DomainError> {
        let mut seats = seat_order(state);
        seats.retain(|id| *id != player_id);
        set_seat_order(state, &seats);
        if state.current_player_id == Some(player_id) {
            state.current_player_id = seats.first().copied();
        }
        Ok(if seats.is_empty() {
            PlayerLeftOutcome::Cancel
        } else {
            self.on_left
        })
    }

    fn finish_due_to_forfeit(
        &self,
        state: &mut GameState,
        remaining: &[i64],
    ) -> Result<(), DomainError> {
        finish_with_winners(state, remaining);
        Ok(())
    }

    fn extract_game_result(&self, state: &GameState) -> Result<GameResult, DomainError> {
        if let Some(reason) = state.data.get("draw_reason").and_then(Value::as_str) {
            return Ok(GameResult::draw(reason));
        }
        let winners = state
            .data
            .get("winners")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();
        Ok(GameResult {
            winner_ids: winners,
            draw_reason: None,
            forfeit_reason: None,
            final_scores: state.data.get("scores").cloned(),
        })
    }

    fn order_player_ids_for_start(&self, mut player_ids: Vec<i64>) -> Vec<i64> {
        if self.reverse_start_order {
            player_ids.reverse();
        }
        player_ids
    }

    fn uses_time_control(&self) -> bool {
        self.time_control
    }

    fn time_expired(&self, state: &GameState, _now: OffsetDateTime) -> bool {
        self.time_control
            && state
                .data
                .get("clock_expired")
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    fn finalize_timeout(
        &self,
        state: &mut GameState,
        player_id: i64,
    ) -> Result<Vec<EventDraft>, DomainError> {
        // `timeout_is_draw` lets a test exercise the draw-on-timeout rule
        // (insufficient material in Chess terms).
        if state
            .data
            .get("timeout_is_draw")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            state.is_finished = true;
            state.current_player_id = None;
            state
                .data
                .insert("draw_reason".into(), json!("insufficient material"));
        } else {
            let remaining: Vec<i64> = seat_order(state)
                .into_iter()
                .filter(|id| *id != player_id)
                .collect();
            finish_with_winners(state, &remaining);
        }
        let result = self.extract_game_result(state)?;
        Ok(vec![
            EventDraft::timeout_flagged(player_id),
            EventDraft::game_finished(&result),
        ])
    }

    fn validate_custom_state(&self, state: &GameState) -> Result<(), DomainError> {
        let target = state
            .data
            .get("target")
            .and_then(Value::as_i64)
            .unwrap_or(TARGET);
        if target < 1 {
            return Err(DomainError::validation(
                ValidationKind::InvalidInput,
                format!("target must be positive, got {target}"),
            ));
        }
        Ok(())
    }
}

/// Two seats, no fallback move, clocks on. The profile Chess runs with.
pub fn duel_rules() -> MatchRules {
    MatchRules {
        min_players: 2,
        max_players: 2,
        entry_fee: 0,
        waiting_timeout: Duration::minutes(5),
        fallback_agents: Vec::new(),
    }
}

/// Two to three seats, an entry fee, and fallback agents to backfill with.
/// The profile Texas Hold'em runs with.
pub fn table_rules() -> MatchRules {
    MatchRules {
        min_players: 2,
        max_players: 3,
        entry_fee: 25,
        waiting_timeout: Duration::minutes(5),
        fallback_agents: vec![
            FallbackAgent {
                agent_version_id: 9001,
                display_name: "House Bot A".into(),
            },
            FallbackAgent {
                agent_version_id: 9002,
                display_name: "House Bot B".into(),
            },
        ],
    }
}

/// Registry with a duel-style counter game in the Chess slot.
pub fn duel_registry() -> GameRegistry {
    let mut registry = GameRegistry::new();
    registry.register(
        Arc::new(CounterEnv::new(GameType::Chess).with_time_control()),
        duel_rules(),
    );
    registry
}

/// Registry with a table-style counter game in the Texas Hold'em slot.
pub fn table_registry() -> GameRegistry {
    let mut registry = GameRegistry::new();
    registry.register(
        Arc::new(
            CounterEnv::new(GameType::TexasHoldem)
                .with_fallback_move()
                .continuing_on_departure(),
        ),
        table_rules(),
    );
    registry
}

/// Registry with both game types registered.
pub fn full_registry() -> GameRegistry {
    let mut registry = GameRegistry::new();
    registry.register(
        Arc::new(CounterEnv::new(GameType::Chess).with_time_control()),
        duel_rules(),
    );
    registry.register(
        Arc::new(
            CounterEnv::new(GameType::TexasHoldem)
                .with_fallback_move()
                .continuing_on_departure(),
        ),
        table_rules(),
    );
    registry
}
