use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{models::events::ServerEvent, services::errors::transport_errors::TransportError};

pub type ConnectionId = Uuid;

/// Outbound half of a client transport.
pub trait EventSink: Send + Sync {
    fn send(&self, event: &ServerEvent) -> Result<(), TransportError>;
}

impl EventSink for UnboundedSender<ServerEvent> {
    fn send(&self, event: &ServerEvent) -> Result<(), TransportError> {
        UnboundedSender::send(self, event.clone()).map_err(|_| TransportError::Closed)
    }
}

struct Connection {
    id: ConnectionId,
    sink: Arc<dyn EventSink>,
}

/// Aggregate outcome of a best-effort delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub attempted: usize,
    pub delivered: usize,
}

/// Live connections per match, at most one per player.
#[derive(Clone, Default)]
pub struct ConnectionHub {
    connections: Arc<DashMap<u64, HashMap<String, Connection>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transport, replacing any previous one for the same player.
    pub fn attach(&self, match_id: u64, player_id: &str, sink: Arc<dyn EventSink>) -> ConnectionId {
        let id = Uuid::new_v4();
        let previous = self
            .connections
            .entry(match_id)
            .or_default()
            .insert(player_id.to_string(), Connection { id, sink });

        if previous.is_some() {
            info!(
                "Player {} reconnected to game {}, previous connection superseded",
                player_id, match_id
            );
        } else {
            info!("Player {} connected to game {}", player_id, match_id);
        }
        id
    }

    /// Removes the player's connection if `connection_id` is still the live one.
    pub fn detach(&self, match_id: u64, player_id: &str, connection_id: ConnectionId) -> bool {
        let removed = {
            let Some(mut players) = self.connections.get_mut(&match_id) else {
                return false;
            };
            match players.get(player_id) {
                Some(connection) if connection.id == connection_id => {
                    players.remove(player_id);
                    true
                }
                _ => false,
            }
        };

        if removed {
            self.connections
                .remove_if(&match_id, |_, players| players.is_empty());
            info!("Player {} disconnected from game {}", player_id, match_id);
        }
        removed
    }

    pub fn is_connected(&self, match_id: u64, player_id: &str) -> bool {
        self.connections
            .get(&match_id)
            .map(|players| players.contains_key(player_id))
            .unwrap_or(false)
    }

    pub fn connected_players(&self, match_id: u64) -> Vec<String> {
        self.connections
            .get(&match_id)
            .map(|players| players.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Drops every connection of a finished match; queued events still drain.
    pub fn close_match(&self, match_id: u64) -> usize {
        self.connections
            .remove(&match_id)
            .map(|(_, players)| players.len())
            .unwrap_or(0)
    }

    pub fn broadcast(&self, match_id: u64, event: &ServerEvent) -> Delivery {
        let recipients: Vec<(String, Arc<dyn EventSink>)> = self
            .connections
            .get(&match_id)
            .map(|players| {
                players
                    .iter()
                    .map(|(player_id, connection)| (player_id.clone(), connection.sink.clone()))
                    .collect()
            })
            .unwrap_or_default();

        deliver(match_id, event, recipients)
    }

    pub fn unicast(&self, match_id: u64, player_id: &str, event: &ServerEvent) -> Delivery {
        let recipient = self.connections.get(&match_id).and_then(|players| {
            players
                .get(player_id)
                .map(|connection| (player_id.to_string(), connection.sink.clone()))
        });

        deliver(match_id, event, recipient.into_iter().collect())
    }
}

fn deliver(
    match_id: u64,
    event: &ServerEvent,
    recipients: Vec<(String, Arc<dyn EventSink>)>,
) -> Delivery {
    let mut delivery = Delivery {
        attempted: recipients.len(),
        delivered: 0,
    };
    for (player_id, sink) in recipients {
        match sink.send(event) {
            Ok(()) => delivery.delivered += 1,
            Err(e) => warn!(
                "Failed to send {} to player {} in game {}: {}",
                event.kind(),
                player_id,
                match_id,
                e
            ),
        }
    }
    debug!(
        "Delivered {} to {} of {} players in game {}",
        event.kind(),
        delivery.delivered,
        delivery.attempted,
        match_id
    );
    delivery
}
