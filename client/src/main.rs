use clap::Parser;
use client::game::ClientGameState;
use client::network::{websocket_url, ApiClient, RealtimeConnection, RealtimeEvent};
use client::rendering;
use log::info;
use shared::{Move, RealtimeMessage, ServerFrame};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

/// Main-method of the application.
/// Creates or joins a game, then runs the interactive loop: stdin lines
/// become moves, realtime frames update the board.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Base URL of the game server
        #[clap(short, long, default_value = "http://127.0.0.1:4000")]
        server: String,
        /// Existing game to join instead of creating a new one
        #[clap(short, long)]
        join: Option<String>,
        /// Stable identity used for reconnection; generated when omitted
        #[clap(short, long)]
        client_id: Option<String>,
    }

    let args = Args::parse();
    let client_id = args.client_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let api = ApiClient::new(args.server.clone(), client_id.clone());

    let game_id = match args.join {
        Some(id) => {
            api.join_game(&id).await?;
            id
        }
        None => api.create_game().await?,
    };
    println!("Game {}", game_id);

    let mut local = ClientGameState::new();
    local.apply_server_state(api.fetch_state(&game_id).await?);

    let url = websocket_url(&args.server, &game_id, &client_id);
    let mut realtime = RealtimeConnection::connect(url);

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    println!("Enter moves as \"x y z\" (0-2 each), or \"quit\" to leave.");

    loop {
        tokio::select! {
            event = realtime.next_event() => match event {
                Some(RealtimeEvent::Connected) => info!("Realtime connection up"),
                Some(RealtimeEvent::Disconnected) => println!("Disconnected, retrying..."),
                Some(RealtimeEvent::Frame(ServerFrame::State(state))) => {
                    local.apply_server_state(state);
                    redraw(&local);
                }
                Some(RealtimeEvent::Frame(ServerFrame::Realtime(message))) => match message {
                    RealtimeMessage::Assign { player } => {
                        local.my_mark = Some(player);
                        println!("You are {}", player);
                    }
                    RealtimeMessage::Players { players } => {
                        local.set_roster(players);
                        println!("{}", rendering::render_roster(&local.roster));
                    }
                    RealtimeMessage::Notification { message } => println!("{}", message),
                    RealtimeMessage::Reject { message } => {
                        println!("Rejected: {}", message);
                        break;
                    }
                },
                None => break,
            },
            line = input.next_line() => {
                let Some(line) = line? else { break };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "quit" {
                    // Resolves once the leave frame is on the wire.
                    realtime.leave().await;
                    break;
                }
                let Some(mark) = local.my_mark else {
                    println!("No mark assigned yet");
                    continue;
                };
                let coords: Vec<i64> = trimmed
                    .split_whitespace()
                    .filter_map(|token| token.parse().ok())
                    .collect();
                if coords.len() != 3 {
                    println!("Enter three coordinates, e.g. \"0 2 1\"");
                    continue;
                }
                let mv = Move { player: mark, x: coords[0], y: coords[1], z: coords[2] };
                if let Err(e) = local.apply_optimistic(&mv) {
                    println!("{}", e);
                    continue;
                }
                redraw(&local);
                match api.submit_move(&game_id, &mv).await {
                    Ok(state) => local.confirm(state),
                    Err(e) => {
                        println!("{}", e);
                        local.rollback();
                        redraw(&local);
                    }
                }
            }
        }
    }

    Ok(())
}

fn redraw(local: &ClientGameState) {
    if let Some(state) = local.state() {
        println!("{}", rendering::render_board(state));
        println!("{}", rendering::render_status(state, local.my_mark));
    }
}
