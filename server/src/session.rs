//! Session orchestration: the single place where game state, slots,
//! identity bindings and connection fan-out are mutated together.
//!
//! Every public method runs to completion under the caller's lock with no
//! awaiting, queuing outbound frames synchronously via the broadcaster.
//! That guarantees each broadcast reflects the state mutation that caused
//! it, and that an eviction has fully vacated the old game before the new
//! binding is recorded.

use crate::bindings::BindingTracker;
use crate::broadcast::{Broadcaster, ConnId, ConnectionHandle};
use crate::registry::GameRegistry;
use crate::slots::SlotManager;
use log::{error, info, warn};
use serde::Serialize;
use shared::{apply_move, GameState, Mark, Move, MoveError, RealtimeMessage};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Game not found")]
    NotFound,
    #[error("Game full")]
    GameFull,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveRequestError {
    #[error("Game not found")]
    NotFound,
    #[error("{0}")]
    Invalid(#[from] MoveError),
}

/// Why a realtime connection is being released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachReason {
    /// The client sent an explicit leave; its identity is forgotten.
    Leave,
    /// The transport closed; the identity is kept so the client can
    /// reclaim its mark on reconnect.
    Closed,
}

#[derive(Default)]
pub struct ServerState {
    registry: GameRegistry,
    slots: SlotManager,
    bindings: BindingTracker,
    broadcaster: Broadcaster,
    next_conn_id: ConnId,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh game and binds the creator to it, evicting them from
    /// any game they were previously in.
    pub fn create_game(&mut self, client_id: Option<&str>) -> String {
        let game_id = self.registry.create();
        self.slots.register_game(&game_id);
        self.broadcaster.register_game(&game_id);
        if let Some(id) = client_id {
            self.bind_client(id, &game_id);
        }
        game_id
    }

    /// Reserves a slot via the request/response path and announces the new
    /// roster to everyone already connected.
    pub fn join_game(&mut self, game_id: &str, client_id: Option<&str>) -> Result<Mark, JoinError> {
        if !self.registry.contains(game_id) {
            return Err(JoinError::NotFound);
        }
        if let Some(id) = client_id {
            self.bind_client(id, game_id);
        }
        let mark = self.slots.reserve(game_id).map_err(|_| JoinError::GameFull)?;
        self.broadcast_roster(game_id, None);
        Ok(mark)
    }

    /// Matches an arriving realtime connection to a slot.
    ///
    /// On success the connection joins the fan-out set, receives its mark
    /// assignment, and everyone (including the newcomer) gets the updated
    /// roster plus a join notification for the others. On failure the
    /// connection gets a reject frame and is closed.
    pub fn attach_connection(
        &mut self,
        game_id: &str,
        client_id: Option<&str>,
        handle: Arc<dyn ConnectionHandle>,
    ) -> Option<(ConnId, Mark)> {
        if !self.registry.contains(game_id) {
            warn!("Realtime connection for unknown game {}", game_id);
            handle.close();
            return None;
        }
        if let Some(id) = client_id {
            self.bind_client(id, game_id);
        }

        let conn = self.next_conn_id;
        self.next_conn_id += 1;

        match self.slots.attach(game_id, client_id, conn) {
            Some(attachment) => {
                // A duplicate connection for the same identity pushed the
                // old one out of its slot; drop it from the fan-out set and
                // close it so it stops receiving frames.
                if let Some(displaced) = attachment.displaced {
                    if let Some(old) = self.broadcaster.remove(game_id, displaced) {
                        old.close();
                    }
                    info!(
                        "Connection {} displaced {} in game {}",
                        conn, displaced, game_id
                    );
                }
                let mark = attachment.mark;
                self.broadcaster.insert(game_id, conn, handle.clone());
                self.send_to(&handle, &RealtimeMessage::Assign { player: mark });
                self.broadcast_roster(game_id, None);
                self.broadcast_frame(
                    game_id,
                    &RealtimeMessage::Notification {
                        message: format!("Player {} joined", mark),
                    },
                    Some(conn),
                );
                info!("Connection {} attached to game {} as {}", conn, game_id, mark);
                Some((conn, mark))
            }
            None => {
                self.send_to(
                    &handle,
                    &RealtimeMessage::Reject {
                        message: "Game full".to_owned(),
                    },
                );
                handle.close();
                None
            }
        }
    }

    /// Releases a connection's slot and announces the departure.
    pub fn detach_connection(&mut self, game_id: &str, conn: ConnId, reason: DetachReason) {
        let handle = self.broadcaster.remove(game_id, conn);
        let clear_identity = reason == DetachReason::Leave;
        if let Some(mark) = self.slots.detach(game_id, conn, clear_identity) {
            self.broadcast_frame(
                game_id,
                &RealtimeMessage::Notification {
                    message: format!("Player {} left", mark),
                },
                None,
            );
            self.broadcast_roster(game_id, None);
            info!("Connection {} detached from game {} ({:?})", conn, game_id, reason);
        }
        if reason == DetachReason::Leave {
            if let Some(handle) = handle {
                handle.close();
            }
        }
    }

    /// Applies a move and pushes the resulting state to every connection.
    pub fn submit_move(&mut self, game_id: &str, mv: Move) -> Result<GameState, MoveRequestError> {
        let game = self
            .registry
            .get_mut(game_id)
            .ok_or(MoveRequestError::NotFound)?;
        apply_move(game, &mv)?;
        let state = game.clone();
        self.broadcast_frame(game_id, &state, None);
        Ok(state)
    }

    pub fn game_state(&self, game_id: &str) -> Option<GameState> {
        self.registry.get(game_id).cloned()
    }

    /// Evicts `client_id` from any game other than `game_id` it is still
    /// bound to, then records the new binding. The old game sees the
    /// departure before the evicted socket is told to close.
    fn bind_client(&mut self, client_id: &str, game_id: &str) {
        if let Some(old_game) = self.bindings.stale_binding(client_id, game_id) {
            if let Some((mark, conn)) = self.slots.evict(&old_game, client_id) {
                let handle = conn.and_then(|c| self.broadcaster.remove(&old_game, c));
                self.broadcast_frame(
                    &old_game,
                    &RealtimeMessage::Notification {
                        message: format!("Player {} left", mark),
                    },
                    None,
                );
                self.broadcast_roster(&old_game, None);
                if let Some(handle) = handle {
                    handle.close();
                }
                info!(
                    "Client {} evicted from game {} after binding to {}",
                    client_id, old_game, game_id
                );
            }
        }
        self.bindings.record(client_id, game_id);
    }

    fn broadcast_roster(&mut self, game_id: &str, exclude: Option<ConnId>) {
        let frame = RealtimeMessage::Players {
            players: self.slots.roster(game_id),
        };
        self.broadcast_frame(game_id, &frame, exclude);
    }

    fn broadcast_frame<T: Serialize>(&self, game_id: &str, frame: &T, exclude: Option<ConnId>) {
        match serde_json::to_string(frame) {
            Ok(payload) => self.broadcaster.broadcast(game_id, &payload, exclude),
            Err(e) => error!("Failed to encode frame for game {}: {}", game_id, e),
        }
    }

    fn send_to<T: Serialize>(&self, handle: &Arc<dyn ConnectionHandle>, frame: &T) {
        match serde_json::to_string(frame) {
            Ok(payload) => {
                if handle.send(&payload).is_err() {
                    warn!("Dropping frame for closed connection");
                }
            }
            Err(e) => error!("Failed to encode frame: {}", e),
        }
    }
}
