//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Each connection forwards the shared event stream to its page and turns the
//! page's messages into timer controls.

use crate::{
    error::ApiError,
    web::{
        controls::{self, TimerCommand},
        protocol::{ClientMessage, ServerMessage},
        state::AppState,
    },
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use flower_timer_core::SettingsUpdate;
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    info!("New WebSocket connection established: {}", connection_id);

    // The sender is shared between the event forwarder and this loop.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // Subscribe before taking the snapshot so no event falls in between.
    let mut events = app_state.subscribe();
    let snapshot = app_state.timer.lock().await.snapshot();
    if let Err(e) = send_message(&ws_sender, &ServerMessage::Snapshot { timer: snapshot }).await {
        error!("Failed to send initial snapshot to {}: {}", connection_id, e);
        return;
    }

    // --- 1. Event Forwarding ---
    let forward_task = {
        let ws_sender = ws_sender.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(message) => {
                        if send_message(&ws_sender, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Connection {} fell behind by {} events.", connection_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    // --- 2. Main Message Loop ---
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                handle_text_message(text.to_string(), &app_state, &ws_sender).await;
            }
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket error on {}: {}", connection_id, e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    forward_task.abort();
    info!("WebSocket connection {} closed.", connection_id);
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(text: String, app_state: &Arc<AppState>, ws_sender: &WsSender) {
    let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let reply = ServerMessage::Error {
                message: format!("Unrecognized message: {}", e),
            };
            if let Err(e) = send_message(ws_sender, &reply).await {
                error!("Failed to send error reply: {}", e);
            }
            return;
        }
    };

    let command = match client_msg {
        ClientMessage::Start => Some(TimerCommand::Start),
        ClientMessage::Pause => Some(TimerCommand::Pause),
        ClientMessage::Skip => Some(TimerCommand::Skip),
        ClientMessage::Reset => Some(TimerCommand::Reset),
        ClientMessage::Key {
            code,
            in_text_input,
        } => TimerCommand::from_key_event(&code, in_text_input),
        ClientMessage::SaveSettings {
            work_duration,
            break_duration,
        } => {
            let update = SettingsUpdate {
                work_duration,
                break_duration,
            };
            controls::save_settings(app_state, &update).await;
            None
        }
        ClientMessage::RequestSnapshot => {
            let snapshot = app_state.timer.lock().await.snapshot();
            if let Err(e) = send_message(ws_sender, &ServerMessage::Snapshot { timer: snapshot }).await {
                error!("Failed to send snapshot: {}", e);
            }
            None
        }
    };

    // Results reach this page through the shared event stream.
    if let Some(command) = command {
        controls::dispatch(app_state, command).await;
    }
}

async fn send_message(ws_sender: &WsSender, message: &ServerMessage) -> Result<(), ApiError> {
    let json = serde_json::to_string(message).map_err(|e| ApiError::Internal(e.to_string()))?;
    ws_sender.lock().await.send(Message::Text(json.into())).await?;
    Ok(())
}
