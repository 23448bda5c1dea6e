use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    models::game_session::{PlayerRef, Session},
    services::errors::session_registry_errors::SessionRegistryError,
};

/// Shared handle to one live session; the mutex is that match's single-writer section.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Process-wide map of live matches.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<u64, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        match_id: u64,
        white: &PlayerRef,
        black: Option<&PlayerRef>,
    ) -> Result<SessionHandle, SessionRegistryError> {
        match self.sessions.entry(match_id) {
            Entry::Occupied(_) => Err(SessionRegistryError::AlreadyExists(match_id)),
            Entry::Vacant(vacant) => {
                let handle = Arc::new(Mutex::new(Session::new(match_id, white, black)));
                vacant.insert(handle.clone());
                info!(
                    "Created session {} ({} vs {})",
                    match_id,
                    white.id,
                    black.map(|b| b.id.as_str()).unwrap_or("bot")
                );
                Ok(handle)
            }
        }
    }

    pub fn get(&self, match_id: u64) -> Option<SessionHandle> {
        self.sessions.get(&match_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, match_id: u64) -> Option<SessionHandle> {
        let removed = self.sessions.remove(&match_id).map(|(_, handle)| handle);
        if removed.is_some() {
            info!("Removed session {}", match_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
