use time::OffsetDateTime;
use tracing::{info, warn};

use super::MatchmakingService;
use crate::billing::LedgerError;
use crate::db::with_txn;
use crate::domain::events::EventDraft;
use crate::domain::ids::GameId;
use crate::engine::MatchRules;
use crate::entities::games::{GameType, MatchmakingStatus};
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError};
use crate::repos::games::GameCreate;
use crate::repos::players::PlayerCreate;
use crate::repos::{events, games, players};
use crate::services::lifecycle::cancel_locked;
use crate::state::AppState;

/// Inputs for [`MatchmakingService::join_matchmaking`].
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub game_type: GameType,
    pub user_id: i64,
    pub agent_version_id: i64,
    pub display_name: String,
}

/// Outcome of a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user now holds a seat.
    Joined {
        game_id: GameId,
        player_id: i64,
        /// Seated players after this join.
        player_count: usize,
        /// Whether this join founded a new WAITING game.
        created: bool,
        /// Whether this join filled the game and started it.
        started: bool,
    },
    /// A concurrent request already seated this user in the game.
    AlreadyJoined { game_id: GameId },
}

/// Outcome of a leave request. Leaving never fails for not being seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub was_in_game: bool,
}

/// What one row-locked join attempt found.
enum CandidateOutcome {
    Joined { player_id: i64, player_count: usize },
    AlreadyJoined,
    Full,
    Gone,
}

impl MatchmakingService {
    /// Join a user's agent into an open WAITING game of the requested
    /// type, founding a new game when no candidate can take them.
    ///
    /// Candidates are tried fullest first to keep the number of open games
    /// small. The listing is advisory; every attempt re-checks status,
    /// membership, and capacity under the row lock. The entry fee is
    /// charged only after a seat is held, and a failed charge gives the
    /// seat back before the error returns.
    pub async fn join_matchmaking(
        &self,
        state: &AppState,
        req: JoinRequest,
    ) -> Result<JoinOutcome, AppError> {
        let rules = state.registry.rules(req.game_type)?.clone();
        let now = OffsetDateTime::now_utc();

        let open = games::find_open_waiting(&state.db, req.game_type, now).await?;
        let mut candidates = Vec::with_capacity(open.len());
        for game in open {
            if players::find_active_by_game_and_user(&state.db, &game.id, req.user_id)
                .await?
                .is_some()
            {
                continue;
            }
            let seated = players::count_active(&state.db, &game.id).await? as usize;
            if seated < rules.max_players {
                candidates.push((game, seated));
            }
        }
        // The listing comes back oldest first; the stable sort keeps that
        // order within one fill level.
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        for (game, _) in candidates {
            match self.try_join_candidate(state, &rules, &game.id, &req).await? {
                CandidateOutcome::Joined {
                    player_id,
                    player_count,
                } => {
                    return self
                        .settle_join(state, &rules, game.id, player_id, player_count, false, &req)
                        .await;
                }
                CandidateOutcome::AlreadyJoined => {
                    info!(game_id = %game.id, user_id = req.user_id, "user already seated");
                    return Ok(JoinOutcome::AlreadyJoined { game_id: game.id });
                }
                CandidateOutcome::Full | CandidateOutcome::Gone => continue,
            }
        }

        let (game_id, player_id) = self.create_and_join(state, &rules, &req).await?;
        self.settle_join(state, &rules, game_id, player_id, 1, true, &req)
            .await
    }

    /// Leave a WAITING game. Idempotent: a user without an active seat
    /// gets `was_in_game = false` instead of an error, no matter whether
    /// the game moved on or never existed.
    pub async fn leave_matchmaking(
        &self,
        state: &AppState,
        game_id: &GameId,
        user_id: i64,
    ) -> Result<LeaveOutcome, AppError> {
        let was_in_game = with_txn(state, |txn| {
            let game_id = game_id.clone();
            Box::pin(async move {
                let Some(game) = games::find_by_id_locked(txn, &game_id).await? else {
                    return Ok(false);
                };
                let Some(seat) =
                    players::find_active_by_game_and_user(txn, &game_id, user_id).await?
                else {
                    return Ok(false);
                };
                match game.status {
                    MatchmakingStatus::Waiting => {
                        players::mark_left(txn, seat.id, OffsetDateTime::now_utc()).await?;
                        events::append_events(txn, &game_id, &[EventDraft::player_left(seat.id)])
                            .await?;
                        Ok(true)
                    }
                    MatchmakingStatus::InProgress => Err(DomainError::conflict(
                        ConflictKind::GameAlreadyStarted,
                        format!("Game {game_id} has already started; leave the game instead"),
                    )
                    .into()),
                    MatchmakingStatus::Finished | MatchmakingStatus::Cancelled => Ok(false),
                }
            })
        })
        .await?;

        if was_in_game {
            info!(game_id = %game_id, user_id, "user left matchmaking");
        }
        Ok(LeaveOutcome { was_in_game })
    }

    /// One row-locked join attempt on a candidate game.
    async fn try_join_candidate(
        &self,
        state: &AppState,
        rules: &MatchRules,
        game_id: &GameId,
        req: &JoinRequest,
    ) -> Result<CandidateOutcome, AppError> {
        let max_players = rules.max_players;
        with_txn(state, |txn| {
            let game_id = game_id.clone();
            let req = req.clone();
            Box::pin(async move {
                let Some(game) = games::find_by_id_locked(txn, &game_id).await? else {
                    return Ok(CandidateOutcome::Gone);
                };
                if game.status != MatchmakingStatus::Waiting {
                    return Ok(CandidateOutcome::Gone);
                }
                if players::find_active_by_game_and_user(txn, &game_id, req.user_id)
                    .await?
                    .is_some()
                {
                    return Ok(CandidateOutcome::AlreadyJoined);
                }
                let seated = players::count_active(txn, &game_id).await? as usize;
                if seated >= max_players {
                    return Ok(CandidateOutcome::Full);
                }

                let seat = players::add_player(
                    txn,
                    PlayerCreate {
                        game_id: game_id.as_str().to_owned(),
                        user_id: Some(req.user_id),
                        agent_version_id: req.agent_version_id,
                        display_name: req.display_name.clone(),
                        is_system: false,
                    },
                )
                .await?;
                events::append_events(
                    txn,
                    &game_id,
                    &[EventDraft::player_joined(seat.id, &seat.display_name)],
                )
                .await?;
                Ok(CandidateOutcome::Joined {
                    player_id: seat.id,
                    player_count: seated + 1,
                })
            })
        })
        .await
    }

    /// Found a new WAITING game with the requester as first player, in one
    /// transaction so no empty game is ever visible to other joiners.
    async fn create_and_join(
        &self,
        state: &AppState,
        rules: &MatchRules,
        req: &JoinRequest,
    ) -> Result<(GameId, i64), AppError> {
        let env = state.registry.env(req.game_type)?;
        let game_id = GameId::generate();
        let (fresh, creation_events) = env.new_game(&game_id)?;
        let deadline = OffsetDateTime::now_utc() + rules.waiting_timeout;

        let player_id = with_txn(state, |txn| {
            let game_id = game_id.clone();
            let req = req.clone();
            Box::pin(async move {
                games::create_game(
                    txn,
                    GameCreate::new(game_id.as_str(), req.game_type, fresh.to_value())
                        .with_current_turn(fresh.turn)
                        .with_waiting_deadline(deadline),
                )
                .await?;
                events::append_events(txn, &game_id, &creation_events).await?;
                let seat = players::add_player(
                    txn,
                    PlayerCreate {
                        game_id: game_id.as_str().to_owned(),
                        user_id: Some(req.user_id),
                        agent_version_id: req.agent_version_id,
                        display_name: req.display_name.clone(),
                        is_system: false,
                    },
                )
                .await?;
                events::append_events(
                    txn,
                    &game_id,
                    &[EventDraft::player_joined(seat.id, &seat.display_name)],
                )
                .await?;
                Ok(seat.id)
            })
        })
        .await?;

        info!(
            game_id = %game_id,
            game_type = %req.game_type,
            user_id = req.user_id,
            "founded waiting game"
        );
        Ok((game_id, player_id))
    }

    /// Charge the entry fee for a held seat, then start the game if this
    /// join filled it.
    async fn settle_join(
        &self,
        state: &AppState,
        rules: &MatchRules,
        game_id: GameId,
        player_id: i64,
        player_count: usize,
        created: bool,
        req: &JoinRequest,
    ) -> Result<JoinOutcome, AppError> {
        if rules.entry_fee > 0 {
            if let Err(charge_err) = state
                .ledger
                .charge_entry_fee(req.user_id, req.game_type, rules.entry_fee)
                .await
            {
                self.compensate_join(state, &game_id, player_id, created).await;
                return Err(match charge_err {
                    LedgerError::InsufficientFunds(msg) => AppError::payment_required(format!(
                        "Cannot cover the {} token entry fee: {msg}",
                        rules.entry_fee
                    )),
                    LedgerError::Unavailable(msg) => {
                        AppError::internal(format!("token ledger unavailable: {msg}"))
                    }
                });
            }
        }

        let mut started = false;
        if player_count >= rules.max_players {
            self.lifecycle.start_existing_game(state, &game_id).await?;
            started = true;
        }

        info!(
            game_id = %game_id,
            user_id = req.user_id,
            player_count,
            created,
            started,
            "user joined matchmaking"
        );
        Ok(JoinOutcome::Joined {
            game_id,
            player_id,
            player_count,
            created,
            started,
        })
    }

    /// Give back a seat whose entry fee failed to charge. Best effort; the
    /// ledger error is what the caller reports.
    ///
    /// A game founded by the unpaid join is cancelled outright. A game the
    /// join filled may already have started by the time the charge
    /// settles; the seat then leaves through the mid-game path so the
    /// environment gets its say.
    async fn compensate_join(
        &self,
        state: &AppState,
        game_id: &GameId,
        player_id: i64,
        created: bool,
    ) {
        let undone = with_txn(state, |txn| {
            let game_id = game_id.clone();
            Box::pin(async move {
                let Some(game) = games::find_by_id_locked(txn, &game_id).await? else {
                    return Ok(true);
                };
                if game.status != MatchmakingStatus::Waiting {
                    return Ok(false);
                }
                players::mark_left(txn, player_id, OffsetDateTime::now_utc()).await?;
                events::append_events(txn, &game_id, &[EventDraft::player_left(player_id)])
                    .await?;
                if created {
                    cancel_locked(txn, game, "entry fee charge failed").await?;
                }
                Ok(true)
            })
        })
        .await;

        match undone {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = self
                    .lifecycle
                    .handle_player_left(state, game_id, player_id)
                    .await
                {
                    warn!(
                        game_id = %game_id,
                        player_id,
                        error = %e,
                        "failed to leave started game after charge failure"
                    );
                }
            }
            Err(e) => {
                warn!(
                    game_id = %game_id,
                    player_id,
                    error = %e,
                    "failed to compensate unpaid join"
                );
            }
        }
    }
}
