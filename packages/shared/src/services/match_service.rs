use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::{
    models::{
        events::{ClientMessage, GameOverEvent, GameStateEvent, MoveEvent, ServerEvent},
        game_record::{GameCompletion, NewGame},
        game_session::{PlayerRef, Session, SessionSnapshot, SessionStatus, BOT_USERNAME},
        matchmaking::{responses::MatchmakingResponse, MatchStatus},
        outcome::{Color, EndReason, Outcome},
    },
    repositories::game_repository::GameRepository,
    services::{
        bot_service::MoveSuggester,
        chess_service::ChessService,
        connection_hub::{ConnectionHub, ConnectionId, EventSink},
        errors::{
            match_service_errors::MatchError, matchmaking_service_errors::MatchmakingServiceError,
        },
        leaderboard_service::LeaderboardService,
        matchmaking_service::MatchmakingService,
        session_registry::SessionRegistry,
    },
};

/// Who is submitting a move.
#[derive(Debug, Clone, Copy)]
enum Mover<'a> {
    Player(&'a str),
    Bot,
}

struct Inner {
    registry: SessionRegistry,
    hub: ConnectionHub,
    chess: ChessService,
    matchmaking: MatchmakingService,
    games: Arc<dyn GameRepository + Send + Sync>,
    leaderboard: LeaderboardService,
    suggester: Arc<dyn MoveSuggester>,
    bot_delay: Duration,
}

/// Drives every live match from pairing to finalize.
///
/// All mutation of one match happens under that session's mutex, so moves,
/// resignations and finalize are totally ordered per match while separate
/// matches proceed independently.
#[derive(Clone)]
pub struct MatchService {
    inner: Arc<Inner>,
}

impl MatchService {
    pub fn new(
        registry: SessionRegistry,
        hub: ConnectionHub,
        matchmaking: MatchmakingService,
        games: Arc<dyn GameRepository + Send + Sync>,
        leaderboard: LeaderboardService,
        suggester: Arc<dyn MoveSuggester>,
        bot_delay: Duration,
    ) -> Self {
        MatchService {
            inner: Arc::new(Inner {
                registry,
                hub,
                chess: ChessService::new(),
                matchmaking,
                games,
                leaderboard,
                suggester,
                bot_delay,
            }),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    pub fn hub(&self) -> &ConnectionHub {
        &self.inner.hub
    }

    pub fn leaderboard(&self) -> &LeaderboardService {
        &self.inner.leaderboard
    }

    pub async fn queue_size(&self) -> Result<u64, MatchError> {
        Ok(self.inner.matchmaking.queue_size().await?)
    }

    /// Queues the player and turns the queue resolution into a live match.
    pub async fn find_match(
        &self,
        player_id: &str,
        username: &str,
    ) -> Result<MatchmakingResponse, MatchError> {
        let result = self
            .inner
            .matchmaking
            .request_match(player_id, username)
            .await?;
        let me = PlayerRef::new(player_id, username);

        if result.status == MatchStatus::BotAssigned {
            let match_id = self.start_match(&me, None).await?;
            return Ok(MatchmakingResponse::bot_game(match_id, BOT_USERNAME));
        }

        let opponent = PlayerRef::new(
            result.opponent_id.as_deref().unwrap_or_default(),
            result.opponent_username.as_deref().unwrap_or_default(),
        );

        match (result.match_id, result.opponent_token.as_deref()) {
            (Some(match_id), _) => Ok(MatchmakingResponse::matched(
                match_id,
                &opponent.username,
                result.color,
            )),
            (None, Some(token)) => {
                let match_id = self.start_match(&me, Some(&opponent)).await?;
                if let Err(e) = self
                    .inner
                    .matchmaking
                    .notify_opponent(token, match_id, player_id, username)
                    .await
                {
                    error!("Could not deliver game {} to {}: {}", match_id, opponent.id, e);
                    self.inner.registry.remove(match_id);
                    return Err(e.into());
                }
                Ok(MatchmakingResponse::matched(
                    match_id,
                    &opponent.username,
                    Color::White,
                ))
            }
            (None, None) => Err(MatchmakingServiceError::IncompleteResult.into()),
        }
    }

    /// Allocates a match id and creates the live session. `black` is `None` for a bot match.
    pub async fn start_match(
        &self,
        white: &PlayerRef,
        black: Option<&PlayerRef>,
    ) -> Result<u64, MatchError> {
        let match_id = self
            .inner
            .games
            .create_game(&NewGame {
                white_player_id: white.id.clone(),
                black_player_id: black.map(|b| b.id.clone()),
                is_bot_game: black.is_none(),
            })
            .await?;
        self.inner.registry.create(match_id, white, black)?;
        info!("Game {} started", match_id);
        Ok(match_id)
    }

    /// Attaches a participant's transport and sends it the current state.
    pub async fn connect(
        &self,
        match_id: u64,
        player_id: &str,
        sink: Arc<dyn EventSink>,
    ) -> Result<ConnectionId, MatchError> {
        let handle = self
            .inner
            .registry
            .get(match_id)
            .ok_or(MatchError::NotFound(match_id))?;
        let session = handle.lock().await;
        if !session.is_active() {
            return Err(MatchError::MatchOver);
        }
        let color = session
            .color_of(player_id)
            .ok_or(MatchError::NotParticipant)?;

        let connection_id = self.inner.hub.attach(match_id, player_id, sink);
        let state = self.game_state(&session, color);
        self.inner
            .hub
            .unicast(match_id, player_id, &ServerEvent::GameState(state));
        Ok(connection_id)
    }

    /// Detaches a transport. The match itself stays active.
    pub async fn disconnect(&self, match_id: u64, player_id: &str, connection_id: ConnectionId) {
        if !self.inner.hub.detach(match_id, player_id, connection_id) {
            return;
        }

        let Some(handle) = self.inner.registry.get(match_id) else {
            return;
        };
        let color = handle.lock().await.color_of(player_id);
        if let Some(color) = color {
            self.inner
                .hub
                .broadcast(match_id, &ServerEvent::opponent_disconnected(color));
        }
    }

    /// Dispatches one inbound message. Failures go back to the sender only.
    pub async fn handle_message(&self, match_id: u64, player_id: &str, message: ClientMessage) {
        debug!("Game {} received {:?} from {}", match_id, message, player_id);
        let result = match message {
            ClientMessage::Move { move_code } => self.on_move(match_id, player_id, &move_code).await,
            ClientMessage::Resign => self.on_resign(match_id, player_id).await,
            ClientMessage::GetState => self.get_state(match_id, player_id).await,
        };

        if let Err(e) = result {
            self.reject(match_id, player_id, &e);
        }
    }

    pub fn reject(&self, match_id: u64, player_id: &str, err: &MatchError) {
        debug!("Rejected message from {} in game {}: {}", player_id, match_id, err);
        self.inner.hub.unicast(
            match_id,
            player_id,
            &ServerEvent::error(err.code(), err.to_string()),
        );
    }

    pub async fn on_move(
        &self,
        match_id: u64,
        player_id: &str,
        move_code: &str,
    ) -> Result<(), MatchError> {
        self.apply_move(match_id, Mover::Player(player_id), move_code)
            .await
    }

    pub async fn on_resign(&self, match_id: u64, player_id: &str) -> Result<(), MatchError> {
        let handle = self
            .inner
            .registry
            .get(match_id)
            .ok_or(MatchError::NotFound(match_id))?;
        let mut session = handle.lock().await;
        if !session.is_active() {
            return Err(MatchError::MatchOver);
        }
        let color = session
            .color_of(player_id)
            .ok_or(MatchError::NotParticipant)?;

        let outcome = Outcome::win_for(color.opposite());
        info!("Player {} resigned game {}", player_id, match_id);
        self.inner.hub.broadcast(
            match_id,
            &ServerEvent::GameOver(GameOverEvent {
                result: outcome,
                reason: EndReason::Resignation,
                white_points: None,
                black_points: None,
            }),
        );
        self.finalize_locked(&mut session, outcome, EndReason::Resignation)
            .await;
        Ok(())
    }

    pub async fn get_state(&self, match_id: u64, player_id: &str) -> Result<(), MatchError> {
        let handle = self
            .inner
            .registry
            .get(match_id)
            .ok_or(MatchError::NotFound(match_id))?;
        let session = handle.lock().await;
        let color = session
            .color_of(player_id)
            .ok_or(MatchError::NotParticipant)?;

        let state = self.game_state(&session, color);
        self.inner
            .hub
            .unicast(match_id, player_id, &ServerEvent::GameState(state));
        Ok(())
    }

    /// Snapshot of a live match for read-only callers.
    pub async fn state(&self, match_id: u64) -> Result<SessionSnapshot, MatchError> {
        let handle = self
            .inner
            .registry
            .get(match_id)
            .ok_or(MatchError::NotFound(match_id))?;
        let session = handle.lock().await;
        let chess = &self.inner.chess;
        let terminal = chess.classify(&session.position);

        Ok(SessionSnapshot {
            game_id: session.match_id,
            white_player_id: session.white_id.clone(),
            white_username: session.white_name.clone(),
            black_player_id: session.black_id.clone(),
            black_username: session.black_name.clone(),
            is_bot_game: session.is_bot_game,
            status: session.status,
            fen: chess.encode(&session.position),
            turn: session.turn(),
            legal_moves: chess.legal_moves(&session.position),
            moves: session.moves.clone(),
            is_game_over: terminal.is_some(),
            result: terminal.map(Outcome::from),
        })
    }

    /// Ends the match once. Returns `false` if it was already over or gone.
    pub async fn finalize(&self, match_id: u64, outcome: Outcome, reason: EndReason) -> bool {
        let Some(handle) = self.inner.registry.get(match_id) else {
            return false;
        };
        let mut session = handle.lock().await;
        self.finalize_locked(&mut session, outcome, reason).await
    }

    async fn apply_move(
        &self,
        match_id: u64,
        mover: Mover<'_>,
        move_code: &str,
    ) -> Result<(), MatchError> {
        let chess = &self.inner.chess;
        let handle = self
            .inner
            .registry
            .get(match_id)
            .ok_or(MatchError::NotFound(match_id))?;
        let mut session = handle.lock().await;

        if !session.is_active() {
            return Err(MatchError::MatchOver);
        }
        let color = match mover {
            Mover::Player(player_id) => session.color_of(player_id),
            Mover::Bot => session.bot_color(),
        }
        .ok_or(MatchError::NotParticipant)?;

        let turn = session.turn();
        let engine_turn = chess.side_to_move(&session.position);
        if turn != engine_turn {
            error!(
                "Game {} has {} moves but the engine reports {} to move",
                match_id,
                session.moves.len(),
                engine_turn
            );
            return Err(MatchError::PositionDesync(format!(
                "log says {}, engine says {}",
                turn, engine_turn
            )));
        }
        if color != turn {
            return Err(MatchError::OutOfTurn);
        }

        let applied = chess.apply(&session.position, move_code)?;
        let fen_after = chess.encode(&applied.position);
        let record = session.record_move(applied, fen_after);
        let terminal = chess.classify(&session.position);

        if let Err(e) = self.inner.games.append_move(match_id, &record).await {
            warn!("Failed to persist move {} of game {}: {}", record.move_number, match_id, e);
        }

        self.inner.hub.broadcast(
            match_id,
            &ServerEvent::Move(MoveEvent {
                move_san: record.notation,
                move_uci: record.move_code,
                fen: record.fen_after,
                turn: session.turn(),
                is_game_over: terminal.is_some(),
                result: terminal.map(Outcome::from),
                is_bot_move: matches!(mover, Mover::Bot),
            }),
        );

        match terminal {
            Some(terminal) => {
                self.finalize_locked(&mut session, terminal.into(), terminal.into())
                    .await;
            }
            None if session.bot_color() == Some(session.turn()) => {
                self.schedule_bot_reply(&mut session);
            }
            None => {}
        }
        Ok(())
    }

    /// The one place a session leaves `Active`.
    async fn finalize_locked(
        &self,
        session: &mut Session,
        outcome: Outcome,
        reason: EndReason,
    ) -> bool {
        if !session.is_active() {
            return false;
        }
        session.status = SessionStatus::Completed;
        if let Some(task) = session.bot_task.take() {
            task.abort();
        }
        let match_id = session.match_id;

        let completion = GameCompletion {
            result: outcome,
            winner_id: session.winner_id(outcome),
            pgn: session.pgn(Some(outcome)),
            moves: session.notation_log(),
            completed_at: Utc::now(),
        };
        if let Err(e) = self.inner.games.finalize_game(match_id, &completion).await {
            error!("Failed to persist result of game {}: {}", match_id, e);
        }

        let black = session.black();
        let awarded = self
            .inner
            .leaderboard
            .apply_outcome(outcome, &session.white(), black.as_ref())
            .await;

        self.inner.hub.broadcast(
            match_id,
            &ServerEvent::GameOver(GameOverEvent {
                result: outcome,
                reason,
                white_points: Some(awarded.white),
                black_points: black.map(|_| awarded.black),
            }),
        );

        self.inner.registry.remove(match_id);
        self.inner.hub.close_match(match_id);
        info!("Game {} finished: {} ({:?})", match_id, outcome, reason);
        true
    }

    fn schedule_bot_reply(&self, session: &mut Session) {
        let service = self.clone();
        let match_id = session.match_id;
        let delay = self.inner.bot_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            service.play_bot_move(match_id).await;
        });
        session.bot_task = Some(task.abort_handle());
    }

    async fn play_bot_move(&self, match_id: u64) {
        let Some(handle) = self.inner.registry.get(match_id) else {
            return;
        };
        let fen = {
            let mut session = handle.lock().await;
            // From here on finalize must not abort this task.
            session.bot_task = None;
            if !session.is_active() || session.bot_color() != Some(session.turn()) {
                return;
            }
            self.inner.chess.encode(&session.position)
        };

        let Some(move_code) = self.inner.suggester.suggest(&fen).await else {
            warn!("No bot move available in game {}, forfeiting", match_id);
            self.forfeit_bot(match_id).await;
            return;
        };

        match self.apply_move(match_id, Mover::Bot, &move_code).await {
            Ok(()) => {}
            Err(e @ (MatchError::IllegalMove(_) | MatchError::InvalidMove(_))) => {
                warn!("Bot suggested {} in game {}: {}", move_code, match_id, e);
                self.forfeit_bot(match_id).await;
            }
            Err(e) => debug!("Bot move in game {} dropped: {}", match_id, e),
        }
    }

    async fn forfeit_bot(&self, match_id: u64) {
        let Some(handle) = self.inner.registry.get(match_id) else {
            return;
        };
        let mut session = handle.lock().await;
        let Some(bot) = session.bot_color() else {
            return;
        };
        self.finalize_locked(&mut session, Outcome::win_for(bot.opposite()), EndReason::Forfeit)
            .await;
    }

    fn game_state(&self, session: &Session, color: Color) -> GameStateEvent {
        let chess = &self.inner.chess;
        let turn = session.turn();
        let legal_moves = if turn == color && session.is_active() {
            chess.legal_moves(&session.position)
        } else {
            vec![]
        };

        GameStateEvent {
            game_id: session.match_id,
            fen: chess.encode(&session.position),
            turn,
            your_color: color,
            legal_moves,
            is_bot_game: session.is_bot_game,
            white_username: session.white_name.clone(),
            black_username: session.black_name.clone(),
            moves: session.notation_log(),
        }
    }
}
