use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::models::matchmaking::{QueueEntry, SlotResult};
use crate::repositories::errors::queue_repository_errors::QueueRepositoryError;

#[cfg(test)]
use mockall::automock;

pub const QUEUE_KEY: &str = "chess:matchmaking:queue";
pub const RESULT_KEY_PREFIX: &str = "chess:matchmaking:results";

fn result_key(entry_token: &str) -> String {
    format!("{}:{}", RESULT_KEY_PREFIX, entry_token)
}

/// Shared FIFO of waiting entrants plus per-entry result slots.
///
/// `pop_head` and `take_result` must be atomic at the store level: two
/// concurrent callers never observe the same entry or slot payload.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueueRepository: Send + Sync {
    async fn push_entry(&self, entry: &QueueEntry) -> Result<(), QueueRepositoryError>;
    async fn pop_head(&self) -> Result<Option<QueueEntry>, QueueRepositoryError>;
    /// Puts a popped entry back where it was taken from.
    async fn restore_head(&self, entry: &QueueEntry) -> Result<(), QueueRepositoryError>;
    /// Removes the entry if it is still queued. Returns whether anything was removed.
    async fn remove_entry(&self, entry: &QueueEntry) -> Result<bool, QueueRepositoryError>;
    async fn put_result(
        &self,
        entry_token: &str,
        result: &SlotResult,
        ttl: Duration,
    ) -> Result<(), QueueRepositoryError>;
    /// Reads and clears the slot in one step.
    async fn take_result(&self, entry_token: &str)
        -> Result<Option<SlotResult>, QueueRepositoryError>;
    async fn len(&self) -> Result<u64, QueueRepositoryError>;
}

#[derive(Clone)]
pub struct RedisQueueRepository {
    connection: ConnectionManager,
}

impl RedisQueueRepository {
    pub async fn connect(url: &str) -> Result<Self, QueueRepositoryError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }

    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl QueueRepository for RedisQueueRepository {
    async fn push_entry(&self, entry: &QueueEntry) -> Result<(), QueueRepositoryError> {
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.connection.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(QUEUE_KEY)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn pop_head(&self) -> Result<Option<QueueEntry>, QueueRepositoryError> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = redis::cmd("RPOP")
            .arg(QUEUE_KEY)
            .query_async(&mut conn)
            .await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn restore_head(&self, entry: &QueueEntry) -> Result<(), QueueRepositoryError> {
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.connection.clone();
        let _: i64 = redis::cmd("RPUSH")
            .arg(QUEUE_KEY)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove_entry(&self, entry: &QueueEntry) -> Result<bool, QueueRepositoryError> {
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.connection.clone();
        let removed: i64 = redis::cmd("LREM")
            .arg(QUEUE_KEY)
            .arg(0)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn put_result(
        &self,
        entry_token: &str,
        result: &SlotResult,
        ttl: Duration,
    ) -> Result<(), QueueRepositoryError> {
        let payload = serde_json::to_string(result)?;
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(result_key(entry_token))
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn take_result(
        &self,
        entry_token: &str,
    ) -> Result<Option<SlotResult>, QueueRepositoryError> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = redis::cmd("GETDEL")
            .arg(result_key(entry_token))
            .query_async(&mut conn)
            .await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn len(&self) -> Result<u64, QueueRepositoryError> {
        let mut conn = self.connection.clone();
        let len: u64 = redis::cmd("LLEN")
            .arg(QUEUE_KEY)
            .query_async(&mut conn)
            .await?;
        Ok(len)
    }
}

#[derive(Default)]
struct InMemoryQueue {
    /// Front is the tail (newest), back is the head (oldest).
    entries: VecDeque<QueueEntry>,
    slots: HashMap<String, (SlotResult, Instant)>,
}

/// Single-process queue store with the same atomicity as the Redis adapter.
#[derive(Default)]
pub struct InMemoryQueueRepository {
    state: Mutex<InMemoryQueue>,
}

impl InMemoryQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result slots currently held, expired or not.
    pub async fn pending_results(&self) -> usize {
        self.state.lock().await.slots.len()
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn push_entry(&self, entry: &QueueEntry) -> Result<(), QueueRepositoryError> {
        self.state.lock().await.entries.push_front(entry.clone());
        Ok(())
    }

    async fn pop_head(&self) -> Result<Option<QueueEntry>, QueueRepositoryError> {
        Ok(self.state.lock().await.entries.pop_back())
    }

    async fn restore_head(&self, entry: &QueueEntry) -> Result<(), QueueRepositoryError> {
        self.state.lock().await.entries.push_back(entry.clone());
        Ok(())
    }

    async fn remove_entry(&self, entry: &QueueEntry) -> Result<bool, QueueRepositoryError> {
        let mut state = self.state.lock().await;
        let before = state.entries.len();
        state.entries.retain(|queued| queued != entry);
        Ok(state.entries.len() != before)
    }

    async fn put_result(
        &self,
        entry_token: &str,
        result: &SlotResult,
        ttl: Duration,
    ) -> Result<(), QueueRepositoryError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.slots.retain(|_, (_, expires_at)| *expires_at > now);
        state
            .slots
            .insert(entry_token.to_string(), (result.clone(), now + ttl));
        Ok(())
    }

    async fn take_result(
        &self,
        entry_token: &str,
    ) -> Result<Option<SlotResult>, QueueRepositoryError> {
        let mut state = self.state.lock().await;
        match state.slots.remove(entry_token) {
            Some((result, expires_at)) if Instant::now() < expires_at => Ok(Some(result)),
            _ => Ok(None),
        }
    }

    async fn len(&self) -> Result<u64, QueueRepositoryError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.slots.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(state.entries.len() as u64)
    }
}
