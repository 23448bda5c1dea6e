use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based, highest score first.
    pub rank: u64,
    pub player_id: String,
    pub username: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    pub total_players: u64,
}
