//! Server communication: the HTTP request/response API and the realtime
//! WebSocket connection.
//!
//! The realtime connection runs in a background task so the main loop never
//! blocks on the transport. The task reconnects on its own with a fixed
//! backoff and reports connectivity transitions alongside decoded frames,
//! letting the UI show a disconnected banner without managing sockets.

use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use serde::Deserialize;
use shared::{GameState, InboundMessage, Mark, Move, ServerFrame};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Fixed delay between reconnection attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on waiting for queued frames to reach the wire at shutdown.
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server refused the request; `message` is its error string.
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Thin wrapper over the request/response API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    game_id: String,
}

#[derive(Deserialize)]
struct JoinResponse {
    player: Mark,
}

#[derive(Deserialize)]
struct MoveResponse {
    state: GameState,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            client_id: client_id.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub async fn create_game(&self) -> Result<String, ApiError> {
        let response = self
            .http
            .post(format!("{}/api/game", self.base_url))
            .query(&[("clientId", &self.client_id)])
            .send()
            .await?;
        let body: CreateResponse = Self::check(response).await?.json().await?;
        Ok(body.game_id)
    }

    pub async fn join_game(&self, game_id: &str) -> Result<Mark, ApiError> {
        let response = self
            .http
            .post(format!("{}/api/game/{}/join", self.base_url, game_id))
            .query(&[("clientId", &self.client_id)])
            .send()
            .await?;
        let body: JoinResponse = Self::check(response).await?.json().await?;
        Ok(body.player)
    }

    pub async fn submit_move(&self, game_id: &str, mv: &Move) -> Result<GameState, ApiError> {
        let response = self
            .http
            .post(format!("{}/api/game/{}/move", self.base_url, game_id))
            .json(mv)
            .send()
            .await?;
        let body: MoveResponse = Self::check(response).await?.json().await?;
        Ok(body.state)
    }

    pub async fn fetch_state(&self, game_id: &str) -> Result<GameState, ApiError> {
        let response = self
            .http
            .get(format!("{}/api/game/{}/state", self.base_url, game_id))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "unknown server error".to_owned(),
        };
        Err(ApiError::Server { status, message })
    }
}

/// Derives the realtime endpoint from the API base URL.
pub fn websocket_url(base_url: &str, game_id: &str, client_id: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_owned()
    };
    format!("{}/ws?gameId={}&clientId={}", ws_base, game_id, client_id)
}

#[derive(Debug)]
pub enum RealtimeEvent {
    Connected,
    Frame(ServerFrame),
    Disconnected,
}

enum OutboundCommand {
    Frame(String),
    /// Flush anything queued, close the socket, confirm, and terminate.
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the background realtime task. Dropping it tears the task down.
pub struct RealtimeConnection {
    events: mpsc::UnboundedReceiver<RealtimeEvent>,
    outbound: mpsc::UnboundedSender<OutboundCommand>,
    task: JoinHandle<()>,
}

impl RealtimeConnection {
    pub fn connect(url: String) -> Self {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_connection(url, event_tx, outbound_rx));
        Self {
            events,
            outbound,
            task,
        }
    }

    pub async fn next_event(&mut self) -> Option<RealtimeEvent> {
        self.events.recv().await
    }

    /// Tells the server this client is leaving its slot for good, and waits
    /// until the frame has been written to the wire (bounded by
    /// [`SHUTDOWN_FLUSH_TIMEOUT`]) so teardown cannot race it away.
    pub async fn leave(&self) {
        match serde_json::to_string(&InboundMessage::Leave) {
            Ok(payload) => {
                let _ = self.outbound.send(OutboundCommand::Frame(payload));
            }
            Err(e) => warn!("Failed to encode leave message: {}", e),
        }

        let (ack, flushed) = oneshot::channel();
        if self.outbound.send(OutboundCommand::Shutdown(ack)).is_err() {
            return;
        }
        if timeout(SHUTDOWN_FLUSH_TIMEOUT, flushed).await.is_err() {
            warn!("Timed out flushing leave message");
        }
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_connection(
    url: String,
    events: mpsc::UnboundedSender<RealtimeEvent>,
    mut outbound: mpsc::UnboundedReceiver<OutboundCommand>,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("Realtime connection established");
                if events.send(RealtimeEvent::Connected).is_err() {
                    return;
                }
                let (mut sink, mut source) = stream.split();

                loop {
                    tokio::select! {
                        inbound = source.next() => match inbound {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str(&text) {
                                    Ok(frame) => {
                                        if events.send(RealtimeEvent::Frame(frame)).is_err() {
                                            return;
                                        }
                                    }
                                    Err(e) => warn!("Ignoring unparseable frame: {}", e),
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("Realtime connection error: {}", e);
                                break;
                            }
                        },
                        command = outbound.recv() => match command {
                            Some(OutboundCommand::Frame(payload)) => {
                                if sink.send(Message::Text(payload.into())).await.is_err() {
                                    break;
                                }
                            }
                            Some(OutboundCommand::Shutdown(ack)) => {
                                // Frames sent above are already on the wire;
                                // close cleanly and confirm.
                                let _ = sink.close().await;
                                let _ = ack.send(());
                                return;
                            }
                            // Owner dropped the handle.
                            None => return,
                        },
                    }
                }
            }
            Err(e) => warn!("Realtime connect failed: {}", e),
        }

        if events.send(RealtimeEvent::Disconnected).is_err() {
            return;
        }

        // Honor shutdown immediately instead of sleeping out the backoff;
        // with no link up there is nothing left to flush.
        tokio::select! {
            _ = sleep(RECONNECT_DELAY) => {}
            command = outbound.recv() => match command {
                Some(OutboundCommand::Shutdown(ack)) => {
                    let _ = ack.send(());
                    return;
                }
                Some(OutboundCommand::Frame(_)) => {}
                None => return,
            },
        }
    }
}
