//! # Game Server Library
//!
//! Authoritative server for multiplayer 3×3×3 tic-tac-toe. It owns every
//! game board, decides which mark each participant plays, and keeps all
//! connected clients synchronized through JSON broadcasts.
//!
//! ## Architecture
//!
//! All shared state lives in one [`session::ServerState`] behind a single
//! mutex. Every operation that touches games, player slots, client bindings,
//! or connection sets runs to completion inside that critical section with no
//! await points, so broadcasts always observe the roster *after* the mutation
//! that caused them. Socket tasks never touch shared state directly: they
//! shuttle frames between the WebSocket and an unbounded per-socket queue,
//! and call into [`session`] when something happens on the wire.
//!
//! ## Module Organization
//!
//! - [`registry`] — game-id to game-state map; creation and lookup.
//! - [`slots`] — per-game player slots: reservation policy, attach matching,
//!   disconnect detection, and slot recycling.
//! - [`bindings`] — client-identity to game map; detects stale participation
//!   when an identity moves to a different game.
//! - [`broadcast`] — connection sets and best-effort fan-out; defines the
//!   [`broadcast::ConnectionHandle`] capability so tests can substitute
//!   recording doubles for real sockets.
//! - [`session`] — the reconciliation protocol tying the above together:
//!   create/join/attach/leave/close/evict.
//! - [`network`] — axum HTTP router and the WebSocket upgrade path.

pub mod bindings;
pub mod broadcast;
pub mod network;
pub mod registry;
pub mod session;
pub mod slots;
