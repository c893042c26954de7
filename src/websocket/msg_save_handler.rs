use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{CollabError, SaveRequestMessage};
use crate::services::collab_service::CollabService;
use crate::ws::connctx::ConnCtx;

/// Handle SaveRequestMessage
pub async fn handle_save_message(
    save_msg: &SaveRequestMessage,
    conn: &ConnCtx,
    service: &CollabService,
    now: DateTime<Utc>,
) -> Result<(), CollabError> {
    info!("Save requested for document {} by {}", save_msg.document_id, save_msg.editor_id);
    service.request_save(conn.conn_id, &conn.outbox, save_msg, now).await
}
