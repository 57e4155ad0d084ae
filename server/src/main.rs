use clap::Parser;
use log::info;
use server::network;
use tokio::net::TcpListener;

/// Main-method of the application.
/// Parses command-line arguments, binds the listener, and serves the HTTP
/// and WebSocket routes until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "4000")]
        port: u16,
    }

    let args = Args::parse();

    let state = network::shared_state();
    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Listening on {}", listener.local_addr()?);

    tokio::select! {
        result = network::serve(listener, state) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
