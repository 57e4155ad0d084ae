//! Message shapes for the realtime (WebSocket) surface.
//!
//! Every outbound frame except the raw game-state snapshot carries a lowercase
//! `type` tag. Snapshots are the serialized [`GameState`](crate::GameState)
//! with no tag, which is why [`ServerFrame`] is untagged: a frame either
//! parses as a tagged realtime message or as a snapshot.

use crate::board::{GameState, Mark};
use serde::{Deserialize, Serialize};

/// One roster line: a mark and whether a live connection holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub player: Mark,
    pub connected: bool,
}

/// Tagged frames the server pushes over a realtime connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RealtimeMessage {
    /// Unicast to a socket right after it claims a slot.
    Assign { player: Mark },
    /// The full roster, broadcast on every roster change.
    Players { players: Vec<RosterEntry> },
    /// Human-readable join/leave notice.
    Notification { message: String },
    /// Sent to a socket that could not be attached, just before closing it.
    Reject { message: String },
}

/// Frames a client may send. Anything that fails to parse is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    /// Explicit leave, processed immediately instead of waiting for the
    /// transport-level close.
    Leave,
}

/// Anything the server may push: a tagged message or a raw state snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Realtime(RealtimeMessage),
    State(GameState),
}
