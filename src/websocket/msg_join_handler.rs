use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{CollabError, JoinMessage};
use crate::services::collab_service::CollabService;
use crate::ws::connctx::ConnCtx;

/// Handle JoinMessage
pub async fn handle_join_message(
    join_msg: &JoinMessage,
    conn: &mut ConnCtx,
    service: &CollabService,
    now: DateTime<Utc>,
) -> Result<(), CollabError> {
    info!("Join message received for document {}: editor={}", join_msg.document_id, join_msg.editor_id);

    // Rejoining the same room under another editor id drops the old identity first
    if let Some(previous) = conn.editor_for(&join_msg.document_id).map(str::to_string) {
        if previous != join_msg.editor_id {
            service.leave(conn.conn_id, &join_msg.document_id, &previous).await.ok();
            conn.forget(&join_msg.document_id);
        }
    }

    service.join(conn.conn_id, &conn.outbox, join_msg, now).await?;
    conn.remember_join(&join_msg.document_id, &join_msg.editor_id);
    Ok(())
}
