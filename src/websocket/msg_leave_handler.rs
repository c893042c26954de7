use tracing::info;

use crate::models::{CollabError, LeaveMessage};
use crate::services::collab_service::CollabService;
use crate::ws::connctx::ConnCtx;

/// Handle LeaveMessage
pub async fn handle_leave_message(
    leave_msg: &LeaveMessage,
    conn: &mut ConnCtx,
    service: &CollabService,
) -> Result<(), CollabError> {
    info!("Leave message received for document {}: editor={}", leave_msg.document_id, leave_msg.editor_id);

    service.leave(conn.conn_id, &leave_msg.document_id, &leave_msg.editor_id).await?;
    conn.forget(&leave_msg.document_id);
    Ok(())
}
