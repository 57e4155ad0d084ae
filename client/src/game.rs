use log::debug;
use shared::{apply_move, GameState, Mark, Move, MoveError, RosterEntry};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocalMoveError {
    #[error("no game state received yet")]
    NoGame,
    #[error(transparent)]
    Rejected(#[from] MoveError),
}

/// Local view of one game: the last authoritative state plus at most one
/// optimistic move awaiting server confirmation.
#[derive(Debug, Clone, Default)]
pub struct ClientGameState {
    state: Option<GameState>,
    /// Snapshot taken before the pending optimistic move, restored on
    /// rejection.
    pre_move: Option<GameState>,
    pub my_mark: Option<Mark>,
    pub roster: Vec<RosterEntry>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Applies a move locally before the server has seen it, keeping a
    /// snapshot for rollback. Fails with the same errors the server would
    /// return, so obviously bad moves never leave the client.
    pub fn apply_optimistic(&mut self, mv: &Move) -> Result<(), LocalMoveError> {
        let state = self.state.as_mut().ok_or(LocalMoveError::NoGame)?;
        let snapshot = state.clone();
        apply_move(state, mv)?;
        self.pre_move = Some(snapshot);
        Ok(())
    }

    /// Restores the pre-move snapshot after a server rejection.
    pub fn rollback(&mut self) {
        if let Some(snapshot) = self.pre_move.take() {
            debug!("Rolling back rejected move");
            self.state = Some(snapshot);
        }
    }

    /// Replaces the optimistic state with the server's confirmed one.
    pub fn confirm(&mut self, state: GameState) {
        self.pre_move = None;
        self.state = Some(state);
    }

    /// Applies an authoritative state pushed over the realtime connection.
    /// Discards any pending optimistic move; the server has the final word.
    pub fn apply_server_state(&mut self, state: GameState) {
        self.pre_move = None;
        self.state = Some(state);
    }

    pub fn set_roster(&mut self, roster: Vec<RosterEntry>) {
        self.roster = roster;
    }
}
