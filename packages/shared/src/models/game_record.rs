use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    game_session::{MoveRecord, SessionStatus},
    outcome::Outcome,
};

/// Parameters for allocating a persisted match record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewGame {
    pub white_player_id: String,
    pub black_player_id: Option<String>,
    pub is_bot_game: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GameRecord {
    pub game_id: u64,
    pub white_player_id: String,
    pub black_player_id: Option<String>,
    pub is_bot_game: bool,
    pub status: SessionStatus,
    pub result: Option<Outcome>,
    pub winner_id: Option<String>,
    pub pgn: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GameRecord {
    pub fn new(game_id: u64, game: &NewGame) -> Self {
        GameRecord {
            game_id,
            white_player_id: game.white_player_id.clone(),
            black_player_id: game.black_player_id.clone(),
            is_bot_game: game.is_bot_game,
            status: SessionStatus::Active,
            result: None,
            winner_id: None,
            pgn: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self, completion: &GameCompletion) {
        self.status = SessionStatus::Completed;
        self.result = Some(completion.result);
        self.winner_id = completion.winner_id.clone();
        self.pgn = Some(completion.pgn.clone());
        self.completed_at = Some(completion.completed_at);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PersistedMove {
    pub game_id: u64,
    pub move_number: u32,
    pub move_san: String,
    pub move_uci: String,
    pub fen_after: String,
    pub recorded_at: DateTime<Utc>,
}

impl PersistedMove {
    pub fn new(game_id: u64, record: &MoveRecord) -> Self {
        PersistedMove {
            game_id,
            move_number: record.move_number,
            move_san: record.notation.clone(),
            move_uci: record.move_code.clone(),
            fen_after: record.fen_after.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// Final outcome and full notation log handed to persistence on finalize.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GameCompletion {
    pub result: Outcome,
    pub winner_id: Option<String>,
    pub pgn: String,
    pub moves: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_game_record() {
        let mut record = GameRecord::new(
            4,
            &NewGame {
                white_player_id: "white_player".to_string(),
                black_player_id: None,
                is_bot_game: true,
            },
        );

        record.complete(&GameCompletion {
            result: Outcome::WhiteWins,
            winner_id: Some("white_player".to_string()),
            pgn: "1. e4 1-0".to_string(),
            moves: vec!["e4".to_string()],
            completed_at: Utc::now(),
        });

        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.result, Some(Outcome::WhiteWins));
        assert!(record.completed_at.is_some());
    }
}
