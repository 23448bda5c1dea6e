use serde::{Deserialize, Serialize};

use crate::models::outcome::{Color, EndReason, Outcome};

/// Inbound frames sent by a connected player.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Move {
        #[serde(rename = "move")]
        move_code: String,
    },
    Resign,
    GetState,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GameStateEvent {
    pub game_id: u64,
    pub fen: String,
    pub turn: Color,
    pub your_color: Color,
    /// Only populated when it is the recipient's turn.
    pub legal_moves: Vec<String>,
    pub is_bot_game: bool,
    pub white_username: String,
    pub black_username: String,
    pub moves: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MoveEvent {
    pub move_san: String,
    pub move_uci: String,
    pub fen: String,
    pub turn: Color,
    pub is_game_over: bool,
    pub result: Option<Outcome>,
    pub is_bot_move: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GameOverEvent {
    pub result: Outcome,
    pub reason: EndReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_points: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black_points: Option<i64>,
}

/// Outbound events pushed to connected players.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    GameState(GameStateEvent),
    OpponentDisconnected { message: String },
    Move(MoveEvent),
    Error { code: String, message: String },
    GameOver(GameOverEvent),
}

impl ServerEvent {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn opponent_disconnected(color: Color) -> Self {
        ServerEvent::OpponentDisconnected {
            message: format!("{} player disconnected", color),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::GameState(_) => "game_state",
            ServerEvent::OpponentDisconnected { .. } => "opponent_disconnected",
            ServerEvent::Move(_) => "move",
            ServerEvent::Error { .. } => "error",
            ServerEvent::GameOver(_) => "game_over",
        }
    }
}
