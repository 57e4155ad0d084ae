//! Types shared between the game server and clients.
//!
//! Everything in this crate is pure data and pure logic: the 3×3×3 board
//! engine with its 49-line win detection, and the JSON message shapes that
//! travel over the HTTP and WebSocket surfaces. No I/O happens here, which
//! lets both binaries and the test suites exercise the same rules without a
//! running server.

pub mod board;
pub mod protocol;

pub use board::{
    apply_move, check_winner, winning_lines, Board, Cell, GameState, Mark, Move, MoveError,
    Winner, BOARD_DIM,
};
pub use protocol::{InboundMessage, RealtimeMessage, RosterEntry, ServerFrame};
