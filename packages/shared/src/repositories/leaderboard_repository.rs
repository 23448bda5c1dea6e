use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;

use crate::models::leaderboard::LeaderboardEntry;
use crate::repositories::errors::leaderboard_repository_errors::LeaderboardRepositoryError;

#[cfg(test)]
use mockall::automock;

pub const LEADERBOARD_KEY: &str = "chess:leaderboard";
pub const LEADERBOARD_NAMES_KEY: &str = "chess:leaderboard:names";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    /// Adds `delta` to the player's score and returns the new total.
    async fn apply_delta(
        &self,
        player_id: &str,
        username: &str,
        delta: i64,
    ) -> Result<i64, LeaderboardRepositoryError>;
    async fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardRepositoryError>;
    async fn rank(&self, player_id: &str)
        -> Result<Option<LeaderboardEntry>, LeaderboardRepositoryError>;
    async fn total(&self) -> Result<u64, LeaderboardRepositoryError>;
}

/// Sorted set of scores keyed by player id, with display names in a side hash.
#[derive(Clone)]
pub struct RedisLeaderboardRepository {
    connection: ConnectionManager,
}

impl RedisLeaderboardRepository {
    pub async fn connect(url: &str) -> Result<Self, LeaderboardRepositoryError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }

    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl LeaderboardRepository for RedisLeaderboardRepository {
    async fn apply_delta(
        &self,
        player_id: &str,
        username: &str,
        delta: i64,
    ) -> Result<i64, LeaderboardRepositoryError> {
        let mut conn = self.connection.clone();
        let _: i64 = redis::cmd("HSET")
            .arg(LEADERBOARD_NAMES_KEY)
            .arg(player_id)
            .arg(username)
            .query_async(&mut conn)
            .await?;
        let score: f64 = redis::cmd("ZINCRBY")
            .arg(LEADERBOARD_KEY)
            .arg(delta)
            .arg(player_id)
            .query_async(&mut conn)
            .await?;
        Ok(score as i64)
    }

    async fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardRepositoryError> {
        if limit == 0 {
            return Ok(vec![]);
        }

        let mut conn = self.connection.clone();
        let scores: Vec<(String, f64)> = redis::cmd("ZREVRANGE")
            .arg(LEADERBOARD_KEY)
            .arg(0)
            .arg(limit as i64 - 1)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await?;
        if scores.is_empty() {
            return Ok(vec![]);
        }

        let names: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(LEADERBOARD_NAMES_KEY)
            .arg(scores.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>())
            .query_async(&mut conn)
            .await?;

        Ok(scores
            .into_iter()
            .zip(names)
            .enumerate()
            .map(|(index, ((player_id, score), name))| LeaderboardEntry {
                rank: index as u64 + 1,
                username: name.unwrap_or_else(|| player_id.clone()),
                player_id,
                points: score as i64,
            })
            .collect())
    }

    async fn rank(
        &self,
        player_id: &str,
    ) -> Result<Option<LeaderboardEntry>, LeaderboardRepositoryError> {
        let mut conn = self.connection.clone();
        let rank: Option<u64> = redis::cmd("ZREVRANK")
            .arg(LEADERBOARD_KEY)
            .arg(player_id)
            .query_async(&mut conn)
            .await?;
        let Some(rank) = rank else {
            return Ok(None);
        };

        let score: Option<f64> = redis::cmd("ZSCORE")
            .arg(LEADERBOARD_KEY)
            .arg(player_id)
            .query_async(&mut conn)
            .await?;
        let name: Option<String> = redis::cmd("HGET")
            .arg(LEADERBOARD_NAMES_KEY)
            .arg(player_id)
            .query_async(&mut conn)
            .await?;

        Ok(Some(LeaderboardEntry {
            rank: rank + 1,
            player_id: player_id.to_string(),
            username: name.unwrap_or_else(|| player_id.to_string()),
            points: score.unwrap_or_default() as i64,
        }))
    }

    async fn total(&self) -> Result<u64, LeaderboardRepositoryError> {
        let mut conn = self.connection.clone();
        let total: u64 = redis::cmd("ZCARD")
            .arg(LEADERBOARD_KEY)
            .query_async(&mut conn)
            .await?;
        Ok(total)
    }
}

#[derive(Default)]
pub struct InMemoryLeaderboardRepository {
    scores: Mutex<HashMap<String, (String, i64)>>,
}

impl InMemoryLeaderboardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn ranked(&self) -> Vec<LeaderboardEntry> {
        let scores = self.scores.lock().await;
        let mut rows: Vec<(&String, &(String, i64))> = scores.iter().collect();
        rows.sort_by(|a, b| b.1 .1.cmp(&a.1 .1).then_with(|| b.0.cmp(a.0)));
        rows.into_iter()
            .enumerate()
            .map(|(index, (player_id, (username, points)))| LeaderboardEntry {
                rank: index as u64 + 1,
                player_id: player_id.clone(),
                username: username.clone(),
                points: *points,
            })
            .collect()
    }
}

#[async_trait]
impl LeaderboardRepository for InMemoryLeaderboardRepository {
    async fn apply_delta(
        &self,
        player_id: &str,
        username: &str,
        delta: i64,
    ) -> Result<i64, LeaderboardRepositoryError> {
        let mut scores = self.scores.lock().await;
        let entry = scores
            .entry(player_id.to_string())
            .or_insert_with(|| (username.to_string(), 0));
        entry.0 = username.to_string();
        entry.1 += delta;
        Ok(entry.1)
    }

    async fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardRepositoryError> {
        Ok(self.ranked().await.into_iter().take(limit).collect())
    }

    async fn rank(
        &self,
        player_id: &str,
    ) -> Result<Option<LeaderboardEntry>, LeaderboardRepositoryError> {
        Ok(self
            .ranked()
            .await
            .into_iter()
            .find(|entry| entry.player_id == player_id))
    }

    async fn total(&self) -> Result<u64, LeaderboardRepositoryError> {
        Ok(self.scores.lock().await.len() as u64)
    }
}
