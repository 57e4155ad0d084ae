//! # Game Client Library
//!
//! Client-side implementation for the cubic tic-tac-toe server. It wraps the
//! HTTP request/response API, maintains the realtime connection that carries
//! live game state, and renders the board to the terminal.
//!
//! ## Architecture Overview
//!
//! The client keeps a local copy of the authoritative game state and applies
//! its own moves to it optimistically, so a placement appears on screen
//! before the server has confirmed it. When the server accepts the move the
//! optimistic state is confirmed; when it rejects the move (occupied cell,
//! finished game) the board rolls back to the pre-move snapshot.
//!
//! The realtime connection runs as a background task that reconnects with a
//! fixed backoff whenever the transport drops, forwarding frames and
//! connectivity changes to the main loop over a channel. The server remains
//! authoritative throughout: every state frame it pushes replaces whatever
//! the client was showing.

pub mod game;
pub mod network;
pub mod rendering;
