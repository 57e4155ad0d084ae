//! The 3×3×3 board engine: board representation, move application, and
//! win/draw detection over the 49 fixed winning lines.
//!
//! The board is indexed `[z][y][x]` (layer, row, column) and serializes each
//! cell as `""`, `"X"`, or `"O"` so the JSON matches what clients render.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Side length of the cube in every dimension.
pub const BOARD_DIM: usize = 3;

/// One of the two player sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The opposing mark.
    pub fn other(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single board cell. Serializes as `""` when empty so the wire format
/// matches the string-grid shape clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell(pub Option<Mark>);

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(mark) => serializer.serialize_str(mark.as_str()),
            None => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellVisitor;

        impl Visitor<'_> for CellVisitor {
            type Value = Cell;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("\"\", \"X\", or \"O\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Cell, E> {
                match value {
                    "" => Ok(Cell(None)),
                    "X" => Ok(Cell(Some(Mark::X))),
                    "O" => Ok(Cell(Some(Mark::O))),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_str(CellVisitor)
    }
}

/// The full cube, indexed `[z][y][x]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[[Cell; BOARD_DIM]; BOARD_DIM]; BOARD_DIM],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell contents at `(x, y, z)`. Coordinates must be in range.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<Mark> {
        self.cells[z][y][x].0
    }

    /// Places `mark` at `(x, y, z)`. Coordinates must be in range.
    pub fn set(&mut self, x: usize, y: usize, z: usize, mark: Mark) {
        self.cells[z][y][x] = Cell(Some(mark));
    }

    /// True when no empty cell remains.
    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .all(|cell| cell.0.is_some())
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut layers = serializer.serialize_seq(Some(BOARD_DIM))?;
        for layer in &self.cells {
            layers.serialize_element(layer)?;
        }
        layers.end()
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells = <[[[Cell; BOARD_DIM]; BOARD_DIM]; BOARD_DIM]>::deserialize(deserializer)?;
        Ok(Board { cells })
    }
}

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    X,
    O,
    Draw,
}

impl From<Mark> for Winner {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Winner::X,
            Mark::O => Winner::O,
        }
    }
}

/// A requested placement. Coordinates are kept signed so out-of-range input
/// from the wire is rejected by the engine, not by deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub player: Mark,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

/// Why a move was rejected. Display strings are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("Game already finished")]
    AlreadyFinished,
    #[error("Invalid coordinates")]
    OutOfRange,
    #[error("Cell already occupied")]
    Occupied,
}

/// Authoritative state of one game as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub id: String,
    pub board: Board,
    pub current_player: Mark,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
}

impl GameState {
    /// A fresh game with an empty board. X always opens.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            board: Board::new(),
            current_player: Mark::X,
            winner: None,
        }
    }
}

/// One winning line as three `(x, y, z)` coordinates.
pub type Line = [(usize, usize, usize); 3];

/// All 49 winning lines of the cube: per layer 3 rows + 3 columns + 2
/// diagonals (8 × 3 layers), 9 verticals through the layers, 12 diagonals
/// through the layers, and the 4 space diagonals.
pub fn winning_lines() -> &'static [Line] {
    static LINES: OnceLock<Vec<Line>> = OnceLock::new();
    LINES.get_or_init(generate_winning_lines)
}

fn generate_winning_lines() -> Vec<Line> {
    let mut lines = Vec::with_capacity(49);

    // Straight lines within each layer (z fixed).
    for z in 0..BOARD_DIM {
        for y in 0..BOARD_DIM {
            lines.push([(0, y, z), (1, y, z), (2, y, z)]);
        }
        for x in 0..BOARD_DIM {
            lines.push([(x, 0, z), (x, 1, z), (x, 2, z)]);
        }
        lines.push([(0, 0, z), (1, 1, z), (2, 2, z)]);
        lines.push([(2, 0, z), (1, 1, z), (0, 2, z)]);
    }

    // Verticals through the layers.
    for x in 0..BOARD_DIM {
        for y in 0..BOARD_DIM {
            lines.push([(x, y, 0), (x, y, 1), (x, y, 2)]);
        }
    }

    // Diagonals through the layers, x fixed then y fixed.
    for x in 0..BOARD_DIM {
        lines.push([(x, 0, 0), (x, 1, 1), (x, 2, 2)]);
        lines.push([(x, 2, 0), (x, 1, 1), (x, 0, 2)]);
    }
    for y in 0..BOARD_DIM {
        lines.push([(0, y, 0), (1, y, 1), (2, y, 2)]);
        lines.push([(2, y, 0), (1, y, 1), (0, y, 2)]);
    }

    // Space diagonals through the cube center.
    lines.push([(0, 0, 0), (1, 1, 1), (2, 2, 2)]);
    lines.push([(2, 0, 0), (1, 1, 1), (0, 2, 2)]);
    lines.push([(0, 2, 0), (1, 1, 1), (2, 0, 2)]);
    lines.push([(2, 2, 0), (1, 1, 1), (0, 0, 2)]);

    lines
}

/// Scans the 49 lines for a winner, falling back to a draw on a full board.
pub fn check_winner(board: &Board) -> Option<Winner> {
    for line in winning_lines() {
        let [(ax, ay, az), (bx, by, bz), (cx, cy, cz)] = *line;
        if let Some(mark) = board.get(ax, ay, az) {
            if board.get(bx, by, bz) == Some(mark) && board.get(cx, cy, cz) == Some(mark) {
                return Some(mark.into());
            }
        }
    }

    if board.is_full() {
        return Some(Winner::Draw);
    }

    None
}

/// Applies a move to `state`, recomputing the winner or flipping the current
/// player. On any error the state is left untouched.
///
/// Turn order is intentionally not enforced: the server echoes whichever
/// mark the move carries, and `current_player` only steers well-behaved
/// clients.
pub fn apply_move(state: &mut GameState, mv: &Move) -> Result<(), MoveError> {
    if state.winner.is_some() {
        return Err(MoveError::AlreadyFinished);
    }

    let in_range = |v: i64| (0..BOARD_DIM as i64).contains(&v);
    if !in_range(mv.x) || !in_range(mv.y) || !in_range(mv.z) {
        return Err(MoveError::OutOfRange);
    }

    let (x, y, z) = (mv.x as usize, mv.y as usize, mv.z as usize);
    if state.board.get(x, y, z).is_some() {
        return Err(MoveError::Occupied);
    }

    state.board.set(x, y, z, mv.player);

    match check_winner(&state.board) {
        Some(winner) => state.winner = Some(winner),
        None => state.current_player = state.current_player.other(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn mv(player: Mark, x: i64, y: i64, z: i64) -> Move {
        Move { player, x, y, z }
    }

    #[test]
    fn test_empty_board_has_no_winner() {
        let board = Board::new();
        assert_eq!(check_winner(&board), None);
    }

    #[test]
    fn test_winning_line_count_and_uniqueness() {
        let lines = winning_lines();
        assert_eq!(lines.len(), 49);

        let mut seen: HashSet<Line> = HashSet::new();
        for line in lines {
            let mut sorted = *line;
            sorted.sort_unstable();
            assert!(seen.insert(sorted), "duplicate line {:?}", line);
        }
    }

    #[test]
    fn test_winning_line_category_counts() {
        let mut in_plane_rows = 0;
        let mut in_plane_cols = 0;
        let mut in_plane_diags = 0;
        let mut verticals = 0;
        let mut layer_diags = 0;
        let mut space_diags = 0;

        for line in winning_lines() {
            let xs: Vec<_> = line.iter().map(|c| c.0).collect();
            let ys: Vec<_> = line.iter().map(|c| c.1).collect();
            let zs: Vec<_> = line.iter().map(|c| c.2).collect();

            let x_fixed = xs[0] == xs[1] && xs[1] == xs[2];
            let y_fixed = ys[0] == ys[1] && ys[1] == ys[2];
            let z_fixed = zs[0] == zs[1] && zs[1] == zs[2];

            match (x_fixed, y_fixed, z_fixed) {
                (false, true, true) => in_plane_rows += 1,
                (true, false, true) => in_plane_cols += 1,
                (false, false, true) => in_plane_diags += 1,
                (true, true, false) => verticals += 1,
                (true, false, false) | (false, true, false) => layer_diags += 1,
                (false, false, false) => space_diags += 1,
                (true, true, true) => panic!("degenerate line {:?}", line),
            }
        }

        assert_eq!(in_plane_rows, 9);
        assert_eq!(in_plane_cols, 9);
        assert_eq!(in_plane_diags, 6);
        assert_eq!(verticals, 9);
        assert_eq!(layer_diags, 12);
        assert_eq!(space_diags, 4);
    }

    #[test]
    fn test_apply_move_places_mark_and_flips_player() {
        let mut state = GameState::new("g1");
        assert_eq!(state.current_player, Mark::X);

        apply_move(&mut state, &mv(Mark::X, 0, 0, 0)).unwrap();
        assert_eq!(state.board.get(0, 0, 0), Some(Mark::X));
        assert_eq!(state.current_player, Mark::O);
        assert_eq!(state.winner, None);
    }

    #[test]
    fn test_apply_move_rejects_out_of_range_without_mutation() {
        let mut state = GameState::new("g1");
        let before = state.clone();

        for bad in [
            mv(Mark::X, 3, 0, 0),
            mv(Mark::X, 0, -1, 0),
            mv(Mark::X, 0, 0, 99),
        ] {
            assert_eq!(apply_move(&mut state, &bad), Err(MoveError::OutOfRange));
            assert_eq!(state, before);
        }
    }

    #[test]
    fn test_apply_move_rejects_occupied_without_mutation() {
        let mut state = GameState::new("g1");
        apply_move(&mut state, &mv(Mark::X, 1, 1, 1)).unwrap();
        let before = state.clone();

        assert_eq!(
            apply_move(&mut state, &mv(Mark::O, 1, 1, 1)),
            Err(MoveError::Occupied)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_apply_move_rejects_after_game_finished_without_mutation() {
        let mut state = GameState::new("g1");
        state.winner = Some(Winner::X);
        let before = state.clone();

        assert_eq!(
            apply_move(&mut state, &mv(Mark::O, 0, 0, 0)),
            Err(MoveError::AlreadyFinished)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_space_diagonal_win_scenario() {
        let mut state = GameState::new("g1");
        let moves = [
            mv(Mark::X, 0, 0, 0),
            mv(Mark::O, 0, 1, 0),
            mv(Mark::X, 1, 1, 1),
            mv(Mark::O, 0, 2, 0),
            mv(Mark::X, 2, 2, 2),
        ];

        for (i, m) in moves.iter().enumerate() {
            apply_move(&mut state, m).unwrap();
            // Every placement so far must still be on the board.
            for placed in &moves[..=i] {
                assert_eq!(
                    state
                        .board
                        .get(placed.x as usize, placed.y as usize, placed.z as usize),
                    Some(placed.player)
                );
            }
            if i < moves.len() - 1 {
                assert_eq!(state.winner, None);
            }
        }

        assert_eq!(state.winner, Some(Winner::X));
    }

    #[test]
    fn test_in_layer_row_win() {
        let mut state = GameState::new("g1");
        for m in [
            mv(Mark::X, 0, 0, 2),
            mv(Mark::O, 0, 0, 0),
            mv(Mark::X, 1, 0, 2),
            mv(Mark::O, 1, 0, 0),
            mv(Mark::X, 2, 0, 2),
        ] {
            apply_move(&mut state, &m).unwrap();
        }
        assert_eq!(state.winner, Some(Winner::X));
        // current_player does not flip once the game concludes
        assert_eq!(state.current_player, Mark::X);
    }

    #[test]
    fn test_draw_requires_full_board() {
        // A lineless board that still has empty cells is in progress, not a
        // draw. (No full 3×3×3 board without a line exists — any two-coloring
        // of the 27 cells contains one of the 49 lines — so the draw branch
        // is only reachable behind the is_full gate tested here.)
        let mut board = Board::new();
        board.set(0, 0, 0, Mark::X);
        board.set(1, 0, 0, Mark::X);
        board.set(2, 0, 0, Mark::O);
        assert!(!board.is_full());
        assert_eq!(check_winner(&board), None);
    }

    #[test]
    fn test_line_takes_precedence_over_draw_on_full_board() {
        // Fill the whole cube with a single mark: every line matches, the
        // scan must report the winner rather than falling through to a draw.
        let mut board = Board::new();
        for z in 0..3 {
            for y in 0..3 {
                for x in 0..3 {
                    board.set(x, y, z, Mark::O);
                }
            }
        }
        assert!(board.is_full());
        assert_eq!(check_winner(&board), Some(Winner::O));
    }

    #[test]
    fn test_game_state_serialization_shape() {
        let mut state = GameState::new("abc");
        apply_move(&mut state, &mv(Mark::X, 2, 0, 1)).unwrap();

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["currentPlayer"], "O");
        assert_eq!(json["board"][1][0][2], "X");
        assert_eq!(json["board"][0][0][0], "");
        // winner key is absent while the game is live
        assert!(json.get("winner").is_none());

        let roundtrip: GameState = serde_json::from_value(json).unwrap();
        assert_eq!(roundtrip, state);
    }

    #[test]
    fn test_winner_serialization() {
        let mut state = GameState::new("abc");
        state.winner = Some(Winner::Draw);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["winner"], "Draw");
    }
}
