//! In-memory registry of games, keyed by their uuid-v4 identifier.
//!
//! The registry exclusively owns game records. Games are created on explicit
//! request and never deleted; finished and abandoned games simply stay in the
//! map for the lifetime of the process.

use log::info;
use shared::GameState;
use std::collections::HashMap;
use uuid::Uuid;

/// Owner of all game records.
#[derive(Debug, Default)]
pub struct GameRegistry {
    games: HashMap<String, GameState>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh game and returns its generated identifier.
    pub fn create(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.games.insert(id.clone(), GameState::new(&id));
        info!("Created game {}", id);
        id
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.games.contains_key(game_id)
    }

    pub fn get(&self, game_id: &str) -> Option<&GameState> {
        self.games.get(game_id)
    }

    pub fn get_mut(&mut self, game_id: &str) -> Option<&mut GameState> {
        self.games.get_mut(game_id)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Mark;

    #[test]
    fn test_create_registers_game_with_unique_ids() {
        let mut registry = GameRegistry::new();
        assert!(registry.is_empty());

        let a = registry.create();
        let b = registry.create();

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&a));
        assert!(registry.contains(&b));
    }

    #[test]
    fn test_new_game_starts_empty_with_x_to_move() {
        let mut registry = GameRegistry::new();
        let id = registry.create();

        let game = registry.get(&id).unwrap();
        assert_eq!(game.id, id);
        assert_eq!(game.current_player, Mark::X);
        assert_eq!(game.winner, None);
        assert_eq!(game.board.get(1, 1, 1), None);
    }

    #[test]
    fn test_unknown_id_lookup_fails() {
        let registry = GameRegistry::new();
        assert!(!registry.contains("missing"));
        assert!(registry.get("missing").is_none());
    }
}
