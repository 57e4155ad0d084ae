//! Terminal rendering of the board and roster.

use shared::{GameState, Mark, RosterEntry, Winner, BOARD_DIM};

fn cell_char(cell: Option<Mark>) -> char {
    match cell {
        Some(Mark::X) => 'X',
        Some(Mark::O) => 'O',
        None => '.',
    }
}

/// The three layers side by side, lowest layer on the left. Within a layer
/// `x` grows rightward and `y` downward.
pub fn render_board(state: &GameState) -> String {
    let mut out = String::from("z=0      z=1      z=2\n");
    for y in 0..BOARD_DIM {
        for z in 0..BOARD_DIM {
            if z > 0 {
                out.push_str("    ");
            }
            for x in 0..BOARD_DIM {
                if x > 0 {
                    out.push(' ');
                }
                out.push(cell_char(state.board.get(x, y, z)));
            }
        }
        out.push('\n');
    }
    out
}

pub fn render_roster(roster: &[RosterEntry]) -> String {
    if roster.is_empty() {
        return "Players: none".to_owned();
    }
    let entries: Vec<String> = roster
        .iter()
        .map(|entry| {
            let presence = if entry.connected { "online" } else { "offline" };
            format!("{} ({})", entry.player, presence)
        })
        .collect();
    format!("Players: {}", entries.join(", "))
}

pub fn render_status(state: &GameState, my_mark: Option<Mark>) -> String {
    match state.winner {
        Some(Winner::Draw) => "Draw".to_owned(),
        Some(Winner::X) => "Winner: X".to_owned(),
        Some(Winner::O) => "Winner: O".to_owned(),
        None => {
            let you = match my_mark {
                Some(mark) if mark == state.current_player => " (you)",
                _ => "",
            };
            format!("Turn: {}{}", state.current_player, you)
        }
    }
}
