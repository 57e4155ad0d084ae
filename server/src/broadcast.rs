//! Per-game connection sets and frame fan-out.
//!
//! Socket tasks register a [`ConnectionHandle`] here; the session layer
//! queues frames onto those handles synchronously while it still holds the
//! state lock, so every connection observes broadcasts in the same order the
//! state mutations happened. Delivery is best-effort per recipient: a
//! connection whose outbound queue has shut down is logged and skipped,
//! never allowed to abort the fan-out.

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Server-wide identifier for a realtime connection.
pub type ConnId = u64;

#[derive(Debug, Error)]
#[error("connection closed")]
pub struct SendError;

/// Queue endpoint for one realtime connection.
///
/// `send` must not block: implementations queue the frame for an async
/// socket task to flush. `close` asks the task to terminate after draining
/// anything already queued.
pub trait ConnectionHandle: Send + Sync {
    fn send(&self, payload: &str) -> Result<(), SendError>;
    fn close(&self);
}

/// The live connections of a single game.
#[derive(Default)]
pub struct ConnectionSet {
    connections: HashMap<ConnId, Arc<dyn ConnectionHandle>>,
}

impl ConnectionSet {
    pub fn insert(&mut self, conn: ConnId, handle: Arc<dyn ConnectionHandle>) {
        self.connections.insert(conn, handle);
    }

    pub fn remove(&mut self, conn: ConnId) -> Option<Arc<dyn ConnectionHandle>> {
        self.connections.remove(&conn)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Queues `payload` on every connection except `exclude`.
    pub fn broadcast(&self, payload: &str, exclude: Option<ConnId>) {
        for (&conn, handle) in &self.connections {
            if Some(conn) == exclude {
                continue;
            }
            if handle.send(payload).is_err() {
                warn!("Dropping frame for closed connection {}", conn);
            }
        }
    }
}

/// All connection sets, keyed by game identifier.
#[derive(Default)]
pub struct Broadcaster {
    sets: HashMap<String, ConnectionSet>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_game(&mut self, game_id: &str) {
        self.sets.entry(game_id.to_owned()).or_default();
    }

    pub fn insert(&mut self, game_id: &str, conn: ConnId, handle: Arc<dyn ConnectionHandle>) {
        self.sets
            .entry(game_id.to_owned())
            .or_default()
            .insert(conn, handle);
    }

    pub fn remove(&mut self, game_id: &str, conn: ConnId) -> Option<Arc<dyn ConnectionHandle>> {
        self.sets.get_mut(game_id)?.remove(conn)
    }

    pub fn connection_count(&self, game_id: &str) -> usize {
        self.sets.get(game_id).map(ConnectionSet::len).unwrap_or(0)
    }

    pub fn broadcast(&self, game_id: &str, payload: &str, exclude: Option<ConnId>) {
        match self.sets.get(game_id) {
            Some(set) => set.broadcast(payload, exclude),
            None => debug!("Broadcast to unknown game {}", game_id),
        }
    }
}
