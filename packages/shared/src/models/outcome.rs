use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<chess::Color> for Color {
    fn from(color: chess::Color) -> Self {
        match color {
            chess::Color::White => Color::White,
            chess::Color::Black => Color::Black,
        }
    }
}

/// Final result of a match as seen by persistence, ranking and clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl Outcome {
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => Outcome::WhiteWins,
            Color::Black => Outcome::BlackWins,
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::WhiteWins => Some(Color::White),
            Outcome::BlackWins => Some(Color::Black),
            Outcome::Draw => None,
        }
    }

    /// Result token used in PGN headers and movetext.
    pub fn pgn_result(self) -> &'static str {
        match self {
            Outcome::WhiteWins => "1-0",
            Outcome::BlackWins => "0-1",
            Outcome::Draw => "1/2-1/2",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::WhiteWins => "white_wins",
            Outcome::BlackWins => "black_wins",
            Outcome::Draw => "draw",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal classification reported by the rules engine adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    FiftyMove,
    Repetition,
}

impl From<Terminal> for Outcome {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Checkmate { winner } => Outcome::win_for(winner),
            // Every other terminal classification is scored as a draw.
            _ => Outcome::Draw,
        }
    }
}

/// Why a match ended, carried on `game_over` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    FiftyMove,
    Repetition,
    Resignation,
    Forfeit,
}

impl From<Terminal> for EndReason {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Checkmate { .. } => EndReason::Checkmate,
            Terminal::Stalemate => EndReason::Stalemate,
            Terminal::InsufficientMaterial => EndReason::InsufficientMaterial,
            Terminal::FiftyMove => EndReason::FiftyMove,
            Terminal::Repetition => EndReason::Repetition,
        }
    }
}
