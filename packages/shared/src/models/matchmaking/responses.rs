use serde::{Deserialize, Serialize};

use crate::models::outcome::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchmakingStatus {
    Searching,
    Matched,
    BotGame,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchmakingResponse {
    pub status: MatchmakingStatus,
    pub game_id: Option<u64>,
    pub opponent: Option<String>,
    pub color: Option<Color>,
}

impl MatchmakingResponse {
    pub fn matched(game_id: u64, opponent: &str, color: Color) -> Self {
        MatchmakingResponse {
            status: MatchmakingStatus::Matched,
            game_id: Some(game_id),
            opponent: Some(opponent.to_string()),
            color: Some(color),
        }
    }

    pub fn bot_game(game_id: u64, opponent: &str) -> Self {
        MatchmakingResponse {
            status: MatchmakingStatus::BotGame,
            game_id: Some(game_id),
            opponent: Some(opponent.to_string()),
            color: Some(Color::White),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_game_response_serialization() {
        let response = MatchmakingResponse::bot_game(3, "Stockfish");

        let serialized = serde_json::to_value(&response).unwrap();

        assert_eq!(serialized["status"], "bot_game");
        assert_eq!(serialized["game_id"], 3);
        assert_eq!(serialized["opponent"], "Stockfish");
        assert_eq!(serialized["color"], "white");
    }

    #[test]
    fn test_matched_response_serialization() {
        let response = MatchmakingResponse::matched(9, "bob", Color::Black);

        let serialized = serde_json::to_value(&response).unwrap();

        assert_eq!(serialized["status"], "matched");
        assert_eq!(serialized["color"], "black");
    }
}
