use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use chrono::Utc;
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn, error};

use crate::AppState;
use crate::models::{CollabError, ReceivedMessage, SendMessage};
use crate::services::collab_service::CollabService;
use crate::ws::connctx::ConnCtx;
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_leave_handler::handle_leave_message;
use crate::websocket::msg_lock_handler::{handle_lock_message, handle_unlock_message};
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::websocket::msg_save_handler::handle_save_message;
use crate::websocket::msg_update_handler::{handle_switch_sheet_message, handle_update_message};

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let service = app_state.collab.clone();

    // Everything for this client goes through its outbox, in order
    let (outbox, mut inbox) = mpsc::unbounded_channel::<SendMessage>();
    let mut conn = ConnCtx::new(outbox);
    let conn_id = conn.conn_id;
    info!("WebSocket connection established with connection_id: {}", conn_id);

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Forward queued messages to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = inbox.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize message for connection {}: {}", conn_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages one at a time
    let recv_loop = async {
        while let Some(frame) = receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket error on connection {}: {}", conn_id, e);
                    break;
                }
            };

            let msg: ReceivedMessage = match serde_json::from_str(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("Failed to parse message on connection {}: {}", conn_id, e);
                    conn.send(SendMessage::error(None, "Malformed message"));
                    continue;
                }
            };
            dispatch(msg, &mut conn, &service).await;
        }
    };

    // Wait for either side to finish
    tokio::select! {
        _ = recv_loop => {},
        _ = (&mut send_task) => {},
    };

    // A dropped connection leaves every room it joined
    let departed = service.disconnect(&conn).await;
    send_task.abort();
    info!("WebSocket connection {} terminated, {} editor(s) left", conn_id, departed);
}

/// Run the handler for one message. Failures, panics included, become an
/// `error` to this connection only.
pub async fn dispatch(msg: ReceivedMessage, conn: &mut ConnCtx, service: &CollabService) {
    let document_id = msg.document_id().map(str::to_string);

    let failure = match AssertUnwindSafe(route(msg, conn, service)).catch_unwind().await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => {
            warn!("Rejected message on connection {}: {}", conn.conn_id, e);
            e.to_string()
        }
        Err(_) => {
            error!("Message handler panicked on connection {}", conn.conn_id);
            // A join that died halfway may have left an empty session behind
            if let Some(document_id) = &document_id {
                service.registry().remove_if_empty(document_id).await;
            }
            "Internal error".to_string()
        }
    };
    conn.send(SendMessage::error(document_id.as_deref(), failure));
}

async fn route(msg: ReceivedMessage, conn: &mut ConnCtx, service: &CollabService) -> Result<(), CollabError> {
    let now = Utc::now();
    match msg {
        ReceivedMessage::Join(m) => handle_join_message(&m, conn, service, now).await,
        ReceivedMessage::Leave(m) => handle_leave_message(&m, conn, service).await,
        ReceivedMessage::LockCell(m) => handle_lock_message(&m, conn, service, now).await,
        ReceivedMessage::UnlockCell(m) => handle_unlock_message(&m, conn, service, now).await,
        ReceivedMessage::CellUpdate(m) => handle_update_message(&m, conn, service, now).await,
        ReceivedMessage::SwitchSheet(m) => handle_switch_sheet_message(&m, conn, service, now).await,
        ReceivedMessage::SaveRequest(m) => handle_save_message(&m, conn, service, now).await,
        ReceivedMessage::Ping(m) => handle_ping_message(&m, conn, service, now).await,
    }
}
