pub mod requests;
pub mod responses;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::outcome::Color;

/// A waiting player's ticket in the shared matchmaking FIFO.
/// `entry_token` names the player's result slot in the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueueEntry {
    pub player_id: String,
    pub username: String,
    pub entry_token: String,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(player_id: &str, username: &str) -> Self {
        QueueEntry {
            player_id: player_id.to_string(),
            username: username.to_string(),
            entry_token: Uuid::new_v4().to_string(),
            enqueued_at: Utc::now(),
        }
    }
}

/// Payload written into a waiting entrant's result slot by the initiator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SlotResult {
    pub match_id: u64,
    pub opponent_id: String,
    pub opponent_username: String,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    BotAssigned,
}

/// Resolution of one `request_match` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub status: MatchStatus,
    /// Set when the id was delivered through the result slot.
    pub match_id: Option<u64>,
    pub opponent_id: Option<String>,
    pub opponent_username: Option<String>,
    pub color: Color,
    /// Set on the initiator side; the allocated match id must be delivered here.
    pub opponent_token: Option<String>,
}

impl MatchResult {
    pub fn initiator(opponent: QueueEntry) -> Self {
        MatchResult {
            status: MatchStatus::Matched,
            match_id: None,
            opponent_id: Some(opponent.player_id),
            opponent_username: Some(opponent.username),
            color: Color::White,
            opponent_token: Some(opponent.entry_token),
        }
    }

    pub fn responder(slot: SlotResult) -> Self {
        MatchResult {
            status: MatchStatus::Matched,
            match_id: Some(slot.match_id),
            opponent_id: Some(slot.opponent_id),
            opponent_username: Some(slot.opponent_username),
            color: slot.color,
            opponent_token: None,
        }
    }

    pub fn bot() -> Self {
        MatchResult {
            status: MatchStatus::BotAssigned,
            match_id: None,
            opponent_id: None,
            opponent_username: None,
            color: Color::White,
            opponent_token: None,
        }
    }

    pub fn is_initiator(&self) -> bool {
        self.status == MatchStatus::Matched && self.opponent_token.is_some()
    }
}
