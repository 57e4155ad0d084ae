//! Tracks which game each client identity is currently bound to.
//!
//! A client may participate in one game at a time. Whenever an identity
//! surfaces on a create, join, or realtime attach for a game other than the
//! one on record, the session layer evicts it from the old game before
//! recording the new binding.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct BindingTracker {
    bindings: HashMap<String, String>,
}

impl BindingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The game the client must be evicted from before binding to
    /// `new_game_id`, if any. Read-only; call [`record`](Self::record) once
    /// the eviction has completed.
    pub fn stale_binding(&self, client_id: &str, new_game_id: &str) -> Option<String> {
        self.bindings
            .get(client_id)
            .filter(|current| current.as_str() != new_game_id)
            .cloned()
    }

    pub fn record(&mut self, client_id: &str, game_id: &str) {
        self.bindings
            .insert(client_id.to_owned(), game_id.to_owned());
    }
}
