use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::{
    models::{
        matchmaking::{MatchResult, QueueEntry, SlotResult},
        outcome::Color,
    },
    repositories::queue_repository::QueueRepository,
    services::errors::matchmaking_service_errors::MatchmakingServiceError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchmakingSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub result_ttl: Duration,
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        MatchmakingSettings {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            result_ttl: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct MatchmakingService {
    repository: Arc<dyn QueueRepository + Send + Sync>,
    settings: MatchmakingSettings,
}

impl MatchmakingService {
    pub fn new(
        repository: Arc<dyn QueueRepository + Send + Sync>,
        settings: MatchmakingSettings,
    ) -> Self {
        MatchmakingService {
            repository,
            settings,
        }
    }

    pub fn settings(&self) -> MatchmakingSettings {
        self.settings
    }

    /// Waits for an opponent until the configured timeout, then falls back to a bot.
    ///
    /// The caller's queue entry is gone from the store on every exit path,
    /// including when this future is dropped before completing.
    pub async fn request_match(
        &self,
        player_id: &str,
        username: &str,
    ) -> Result<MatchResult, MatchmakingServiceError> {
        let entry = QueueEntry::new(player_id, username);
        self.repository.push_entry(&entry).await?;
        let mut footprint = QueueFootprint::new(self.repository.clone(), entry.clone());
        info!("Player {} joined the matchmaking queue", player_id);

        let deadline = Instant::now() + self.settings.timeout;
        let result = self.poll(&entry, deadline).await?;
        footprint.disarm();

        info!(
            "Player {} resolved matchmaking as {:?} ({})",
            player_id, result.status, result.color
        );
        Ok(result)
    }

    async fn poll(
        &self,
        entry: &QueueEntry,
        deadline: Instant,
    ) -> Result<MatchResult, MatchmakingServiceError> {
        loop {
            if let Some(slot) = self.repository.take_result(&entry.entry_token).await? {
                self.repository.remove_entry(entry).await?;
                return Ok(MatchResult::responder(slot));
            }

            if let Some(result) = self.try_match(entry).await? {
                return Ok(result);
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep_until((now + self.settings.poll_interval).min(deadline)).await;
        }

        if self.repository.remove_entry(entry).await? {
            // Still queued, so nobody can be about to deliver a result.
            if let Some(slot) = self.repository.take_result(&entry.entry_token).await? {
                return Ok(MatchResult::responder(slot));
            }
            return Ok(MatchResult::bot());
        }

        // Claimed by an initiator that has not delivered the match id yet.
        debug!(
            "Entry for {} was claimed at timeout, waiting for its result slot",
            entry.player_id
        );
        let grace_deadline = Instant::now() + self.settings.result_ttl;
        loop {
            if let Some(slot) = self.repository.take_result(&entry.entry_token).await? {
                return Ok(MatchResult::responder(slot));
            }
            let now = Instant::now();
            if now >= grace_deadline {
                warn!(
                    "No result delivered for claimed entry of {}, assigning a bot",
                    entry.player_id
                );
                return Ok(MatchResult::bot());
            }
            sleep_until((now + self.settings.poll_interval).min(grace_deadline)).await;
        }
    }

    /// One atomic pop from the head of the queue.
    async fn try_match(
        &self,
        entry: &QueueEntry,
    ) -> Result<Option<MatchResult>, MatchmakingServiceError> {
        let Some(popped) = self.repository.pop_head().await? else {
            return Ok(None);
        };

        if popped.player_id == entry.player_id {
            self.repository.restore_head(&popped).await?;
            return Ok(None);
        }

        if !self.repository.remove_entry(entry).await? {
            // Someone else already paired us; their result is on its way.
            self.repository.restore_head(&popped).await?;
            return Ok(None);
        }

        debug!("Player {} paired with {}", entry.player_id, popped.player_id);
        Ok(Some(MatchResult::initiator(popped)))
    }

    /// Delivers the allocated match id to the responder's result slot.
    pub async fn notify_opponent(
        &self,
        opponent_token: &str,
        match_id: u64,
        player_id: &str,
        username: &str,
    ) -> Result<(), MatchmakingServiceError> {
        let slot = SlotResult {
            match_id,
            opponent_id: player_id.to_string(),
            opponent_username: username.to_string(),
            color: Color::Black,
        };
        self.repository
            .put_result(opponent_token, &slot, self.settings.result_ttl)
            .await?;
        Ok(())
    }

    pub async fn queue_size(&self) -> Result<u64, MatchmakingServiceError> {
        Ok(self.repository.len().await?)
    }
}

/// Removes a queue entry when `request_match` exits without resolving.
struct QueueFootprint {
    repository: Arc<dyn QueueRepository + Send + Sync>,
    entry: Option<QueueEntry>,
}

impl QueueFootprint {
    fn new(repository: Arc<dyn QueueRepository + Send + Sync>, entry: QueueEntry) -> Self {
        QueueFootprint {
            repository,
            entry: Some(entry),
        }
    }

    fn disarm(&mut self) {
        self.entry = None;
    }
}

impl Drop for QueueFootprint {
    fn drop(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime to clean up queue entry of {}", entry.player_id);
            return;
        };
        let repository = self.repository.clone();
        handle.spawn(async move {
            if let Err(e) = repository.remove_entry(&entry).await {
                warn!("Failed to remove queue entry of {}: {}", entry.player_id, e);
            }
        });
    }
}
