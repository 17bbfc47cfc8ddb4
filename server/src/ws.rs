use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::game_loop::{GameBroadcast, GameCommand};
use crate::player::PlayerId;
use crate::protocol::{ClientMsg, ServerMsg};

const DEFAULT_NAME: &str = "Player";
const MAX_NAME_CHARS: usize = 20;
/// Close code for "try again later"
const CLOSE_TRY_AGAIN: u16 = 1013;
const CLOSE_POLICY: u16 = 1008;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub broadcast_tx: broadcast::Sender<GameBroadcast>,
    pub max_message_bytes: usize,
    pub max_parse_errors: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    pub name: Option<String>,
}

/// Trimmed, control characters removed, at most `MAX_NAME_CHARS` long.
pub fn sanitize_name(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();
    if cleaned.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        cleaned
    }
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<JoinParams>,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    let name = sanitize_name(params.name.as_deref());
    let max_message_bytes = app_state.max_message_bytes;
    ws.max_message_size(max_message_bytes.saturating_mul(4))
        .on_upgrade(move |socket| handle_socket(socket, app_state, name))
}

type WsSink = SplitSink<WebSocket, Message>;

/// Serialize and send. Only transport failures are errors.
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            Ok(())
        }
    }
}

async fn close_with(sink: &mut WsSink, code: u16, reason: &str) {
    let frame = CloseFrame {
        code,
        reason: reason.to_string().into(),
    };
    let _ = sink.send(Message::Close(Some(frame))).await;
}

async fn handle_socket(socket: WebSocket, app_state: AppState, name: String) {
    let (mut sink, mut stream) = socket.split();

    // Join the match
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::PlayerJoin {
            name,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send PlayerJoin command");
        return;
    }

    let (my_id, welcome) = match resp_rx.await {
        Ok(Ok(joined)) => joined,
        Ok(Err(reason)) => {
            close_with(&mut sink, CLOSE_TRY_AGAIN, &reason.to_string()).await;
            return;
        }
        Err(_) => {
            tracing::error!("Failed to receive welcome");
            return;
        }
    };

    tracing::info!("Player {} connected", my_id);

    // Subscribe before the welcome so no event in between is missed
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();

    if send_msg(&mut sink, &ServerMsg::Welcome(welcome)).await.is_err() {
        leave(&app_state, my_id).await;
        return;
    }

    let mut parse_errors: u32 = 0;

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > app_state.max_message_bytes {
                            tracing::warn!("Player {} sent an oversized message ({} bytes)", my_id, text.len());
                            continue;
                        }
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(ClientMsg::PlayerInput(input)) => {
                                let _ = app_state
                                    .game_tx
                                    .send(GameCommand::PlayerInput { id: my_id, input })
                                    .await;
                            }
                            Err(e) => {
                                parse_errors += 1;
                                tracing::warn!("Player {} sent a malformed message: {}", my_id, e);
                                if parse_errors > app_state.max_parse_errors {
                                    close_with(&mut sink, CLOSE_POLICY, "too many malformed messages").await;
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Player {} socket error: {}", my_id, e);
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client (broadcast)
            result = broadcast_rx.recv() => {
                match result {
                    Ok(broadcast) => {
                        let msg = match broadcast {
                            GameBroadcast::State(state) => ServerMsg::GameState(state),
                            GameBroadcast::Event(msg) => msg,
                            GameBroadcast::Direct { player_id, msg } => {
                                if player_id != my_id {
                                    continue; // Not for this client
                                }
                                msg
                            }
                        };
                        if send_msg(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Player {} lagged by {} messages", my_id, n);
                        // Snapshots are complete; the next one catches the client up
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    leave(&app_state, my_id).await;
}

async fn leave(app_state: &AppState, id: PlayerId) {
    let _ = app_state.game_tx.send(GameCommand::PlayerLeave { id }).await;
    tracing::info!("Player {} disconnected", id);
}
