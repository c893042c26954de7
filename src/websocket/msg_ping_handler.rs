use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::models::{CollabError, PingMessage, PongMessage, SendMessage};
use crate::services::collab_service::CollabService;
use crate::ws::connctx::ConnCtx;

/// Handle PingMessage
pub async fn handle_ping_message(
    _ping_msg: &PingMessage,
    conn: &ConnCtx,
    service: &CollabService,
    now: DateTime<Utc>,
) -> Result<(), CollabError> {
    // Handle ping message - keep the editor alive and send a pong message back.
    debug!("Ping message received on connection {}", conn.conn_id);
    service.touch_connection(conn, now).await;

    let pong = SendMessage::Pong(PongMessage { date: now.to_rfc3339() });
    if !conn.send(pong) {
        error!("Failed to send Pong message on connection {}", conn.conn_id);
    }
    Ok(())
}
