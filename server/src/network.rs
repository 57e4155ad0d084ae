//! HTTP and WebSocket surface.
//!
//! All routes share one `Arc<Mutex<ServerState>>`; handlers take the lock,
//! mutate, queue outbound frames, and release before any await. Socket tasks
//! are plain shuttles: they flush queued frames to the wire and feed inbound
//! messages back to the session layer, holding no game state of their own.

use crate::broadcast::{ConnectionHandle, SendError};
use crate::session::{DetachReason, JoinError, MoveRequestError, ServerState};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::SinkExt;
use log::debug;
use serde::Deserialize;
use serde_json::json;
use shared::{GameState, InboundMessage, Move};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub type SharedState = Arc<Mutex<ServerState>>;

pub fn shared_state() -> SharedState {
    Arc::new(Mutex::new(ServerState::new()))
}

/// Locks the shared state, recovering from a poisoned lock; handlers never
/// leave the state in an inconsistent state mid-mutation.
fn lock(state: &SharedState) -> MutexGuard<'_, ServerState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::NotFound => ApiError::NotFound(err.to_string()),
            JoinError::GameFull => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<MoveRequestError> for ApiError {
    fn from(err: MoveRequestError) -> Self {
        match err {
            MoveRequestError::NotFound => ApiError::NotFound(err.to_string()),
            MoveRequestError::Invalid(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityQuery {
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeQuery {
    game_id: String,
    client_id: Option<String>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/game", post(create_game))
        .route("/api/game/{id}/join", post(join_game))
        .route("/api/game/{id}/move", post(submit_move))
        .route("/api/game/{id}/state", get(game_state))
        .route("/ws", get(realtime_upgrade))
        .with_state(state)
}

/// Binds the router to `listener` and serves until the process is stopped.
pub async fn serve(listener: TcpListener, state: SharedState) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

async fn create_game(
    State(state): State<SharedState>,
    Query(query): Query<IdentityQuery>,
) -> Json<serde_json::Value> {
    let game_id = lock(&state).create_game(query.client_id.as_deref());
    Json(json!({ "gameId": game_id }))
}

async fn join_game(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mark = lock(&state).join_game(&game_id, query.client_id.as_deref())?;
    Ok(Json(json!({ "success": true, "player": mark })))
}

async fn submit_move(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
    Json(mv): Json<Move>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let new_state = lock(&state).submit_move(&game_id, mv)?;
    Ok(Json(json!({ "success": true, "state": new_state })))
}

async fn game_state(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameState>, ApiError> {
    lock(&state)
        .game_state(&game_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Game not found".to_owned()))
}

async fn realtime_upgrade(
    State(state): State<SharedState>,
    Query(query): Query<RealtimeQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.game_id, query.client_id))
}

enum SocketCommand {
    Send(String),
    Close,
}

/// Session-side endpoint of a socket's outbound queue.
struct WsHandle {
    tx: mpsc::UnboundedSender<SocketCommand>,
}

impl ConnectionHandle for WsHandle {
    fn send(&self, payload: &str) -> Result<(), SendError> {
        self.tx
            .send(SocketCommand::Send(payload.to_owned()))
            .map_err(|_| SendError)
    }

    fn close(&self) {
        let _ = self.tx.send(SocketCommand::Close);
    }
}

async fn handle_socket(
    mut socket: WebSocket,
    state: SharedState,
    game_id: String,
    client_id: Option<String>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle: Arc<dyn ConnectionHandle> = Arc::new(WsHandle { tx });

    // On rejection no slot is held, but queued frames (the reject) are still
    // flushed by the loop below before the Close command ends it.
    let mut conn = lock(&state)
        .attach_connection(&game_id, client_id.as_deref(), handle)
        .map(|(conn, _)| conn);

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(SocketCommand::Send(payload)) => {
                    if socket.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Some(SocketCommand::Close) | None => break,
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str(&text) {
                        Ok(InboundMessage::Leave) => {
                            if let Some(conn) = conn.take() {
                                lock(&state).detach_connection(
                                    &game_id,
                                    conn,
                                    DetachReason::Leave,
                                );
                            }
                        }
                        Err(e) => debug!("Ignoring unparseable message: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Socket error on game {}: {}", game_id, e);
                    break;
                }
            },
        }
    }

    if let Some(conn) = conn {
        lock(&state).detach_connection(&game_id, conn, DetachReason::Closed);
    }
    let _ = socket.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MoveError;

    #[test]
    fn test_join_errors_map_to_status_and_message() {
        let not_found = ApiError::from(JoinError::NotFound);
        assert!(matches!(&not_found, ApiError::NotFound(m) if m == "Game not found"));

        let full = ApiError::from(JoinError::GameFull);
        assert!(matches!(&full, ApiError::BadRequest(m) if m == "Game full"));
    }

    #[test]
    fn test_move_errors_preserve_engine_message() {
        let err = ApiError::from(MoveRequestError::Invalid(MoveError::Occupied));
        assert!(matches!(&err, ApiError::BadRequest(m) if m == "Cell already occupied"));

        let err = ApiError::from(MoveRequestError::NotFound);
        assert!(matches!(&err, ApiError::NotFound(m) if m == "Game not found"));
    }

    #[test]
    fn test_closed_queue_reports_send_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = WsHandle { tx };
        drop(rx);
        assert!(handle.send("frame").is_err());
    }
}
