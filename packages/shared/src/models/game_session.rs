use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    models::outcome::{Color, Outcome},
    services::chess_service::{AppliedMove, Position},
};

/// Display name used for the computer side of a bot match.
pub const BOT_USERNAME: &str = "Stockfish";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub move_number: u32,
    pub notation: String,
    pub move_code: String,
    pub fen_after: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: String,
    pub username: String,
}

impl PlayerRef {
    pub fn new(id: &str, username: &str) -> Self {
        PlayerRef {
            id: id.to_string(),
            username: username.to_string(),
        }
    }
}

/// Authoritative in-memory state of one live match.
#[derive(Debug)]
pub struct Session {
    pub match_id: u64,
    pub white_id: String,
    pub white_name: String,
    /// `None` when black is the bot.
    pub black_id: Option<String>,
    pub black_name: String,
    pub is_bot_game: bool,
    pub position: Position,
    pub moves: Vec<MoveRecord>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub(crate) bot_task: Option<tokio::task::AbortHandle>,
}

impl Session {
    pub fn new(match_id: u64, white: &PlayerRef, black: Option<&PlayerRef>) -> Self {
        Session {
            match_id,
            white_id: white.id.clone(),
            white_name: white.username.clone(),
            black_id: black.map(|b| b.id.clone()),
            black_name: black
                .map(|b| b.username.clone())
                .unwrap_or_else(|| BOT_USERNAME.to_string()),
            is_bot_game: black.is_none(),
            position: Position::starting(),
            moves: vec![],
            status: SessionStatus::Active,
            created_at: Utc::now(),
            bot_task: None,
        }
    }

    /// Side to move as derived from the move log.
    pub fn turn(&self) -> Color {
        if self.moves.len() % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn color_of(&self, player_id: &str) -> Option<Color> {
        if self.white_id == player_id {
            Some(Color::White)
        } else if self.black_id.as_deref() == Some(player_id) {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn bot_color(&self) -> Option<Color> {
        self.is_bot_game.then_some(Color::Black)
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn white(&self) -> PlayerRef {
        PlayerRef::new(&self.white_id, &self.white_name)
    }

    /// The human black player, absent in bot matches.
    pub fn black(&self) -> Option<PlayerRef> {
        self.black_id
            .as_deref()
            .map(|id| PlayerRef::new(id, &self.black_name))
    }

    pub fn winner_id(&self, outcome: Outcome) -> Option<String> {
        match outcome.winner()? {
            Color::White => Some(self.white_id.clone()),
            Color::Black => self.black_id.clone(),
        }
    }

    /// Appends the applied move to the log and adopts its resulting position.
    pub fn record_move(&mut self, applied: AppliedMove, fen_after: String) -> MoveRecord {
        let record = MoveRecord {
            move_number: self.moves.len() as u32 + 1,
            notation: applied.notation,
            move_code: applied.move_code,
            fen_after,
        };
        self.position = applied.position;
        self.moves.push(record.clone());
        record
    }

    pub fn notation_log(&self) -> Vec<String> {
        self.moves.iter().map(|m| m.notation.clone()).collect()
    }

    pub fn pgn(&self, outcome: Option<Outcome>) -> String {
        let result = outcome.map(Outcome::pgn_result).unwrap_or("*");
        let mut pgn = format!(
            "[Event \"Live match\"]\n[Date \"{}\"]\n[White \"{}\"]\n[Black \"{}\"]\n[Result \"{}\"]\n\n",
            self.created_at.format("%Y.%m.%d"),
            self.white_name,
            self.black_name,
            result
        );

        let mut movetext: Vec<String> = Vec::with_capacity(self.moves.len() + self.moves.len() / 2 + 1);
        for (index, record) in self.moves.iter().enumerate() {
            if index % 2 == 0 {
                movetext.push(format!("{}.", index / 2 + 1));
            }
            movetext.push(record.notation.clone());
        }
        movetext.push(result.to_string());
        pgn.push_str(&movetext.join(" "));
        pgn
    }
}

/// Read-only view of a live match for the HTTP state endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub game_id: u64,
    pub white_player_id: String,
    pub white_username: String,
    pub black_player_id: Option<String>,
    pub black_username: String,
    pub is_bot_game: bool,
    pub status: SessionStatus,
    pub fen: String,
    pub turn: Color,
    pub legal_moves: Vec<String>,
    pub moves: Vec<MoveRecord>,
    pub is_game_over: bool,
    pub result: Option<Outcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chess_service::ChessService;
    use proptest::prelude::*;

    fn human_session() -> Session {
        Session::new(
            7,
            &PlayerRef::new("white_player", "alice"),
            Some(&PlayerRef::new("black_player", "bob")),
        )
    }

    #[test]
    fn test_session_creation() {
        let session = human_session();

        assert_eq!(session.match_id, 7);
        assert_eq!(session.turn(), Color::White);
        assert_eq!(session.status, SessionStatus::Active);
        assert!(!session.is_bot_game);
        assert!(session.moves.is_empty());
    }

    #[test]
    fn test_bot_session_uses_bot_name() {
        let session = Session::new(1, &PlayerRef::new("white_player", "alice"), None);

        assert!(session.is_bot_game);
        assert_eq!(session.black_name, BOT_USERNAME);
        assert_eq!(session.bot_color(), Some(Color::Black));
        assert_eq!(session.black(), None);
        assert_eq!(session.color_of("Stockfish"), None);
    }

    #[test]
    fn test_color_of() {
        let session = human_session();

        assert_eq!(session.color_of("white_player"), Some(Color::White));
        assert_eq!(session.color_of("black_player"), Some(Color::Black));
        assert_eq!(session.color_of("spectator"), None);
    }

    #[test]
    fn test_winner_id() {
        let session = human_session();

        assert_eq!(
            session.winner_id(Outcome::BlackWins),
            Some("black_player".to_string())
        );
        assert_eq!(session.winner_id(Outcome::Draw), None);
    }

    #[test]
    fn test_pgn_export() {
        let chess = ChessService::new();
        let mut session = human_session();
        for code in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            let applied = chess.apply(&session.position, code).unwrap();
            let fen = chess.encode(&applied.position);
            session.record_move(applied, fen);
        }

        let pgn = session.pgn(Some(Outcome::BlackWins));

        assert!(pgn.contains("[White \"alice\"]"));
        assert!(pgn.contains("[Result \"0-1\"]"));
        assert!(pgn.ends_with("1. f3 e5 2. g4 Qh4# 0-1"));
    }

    proptest! {
        #[test]
        fn test_turn_parity_matches_engine(choices in prop::collection::vec(0usize..64, 0..40)) {
            let chess = ChessService::new();
            let mut session = human_session();

            for choice in choices {
                if chess.is_terminal(&session.position) {
                    break;
                }
                let legal = chess.legal_moves(&session.position);
                let code = legal[choice % legal.len()].clone();
                let mover = session.turn();

                let applied = chess.apply(&session.position, &code).unwrap();
                let fen = chess.encode(&applied.position);
                let record = session.record_move(applied, fen);

                prop_assert_eq!(record.move_number as usize, session.moves.len());
                prop_assert_eq!(session.turn(), mover.opposite());
                prop_assert_eq!(session.turn(), chess.side_to_move(&session.position));
            }
        }
    }
}
