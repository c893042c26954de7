use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{CellUpdateMessage, CollabError, SwitchSheetMessage};
use crate::services::collab_service::CollabService;
use crate::ws::connctx::ConnCtx;

/// Handle CellUpdateMessage
pub async fn handle_update_message(
    update_msg: &CellUpdateMessage,
    conn: &ConnCtx,
    service: &CollabService,
    now: DateTime<Utc>,
) -> Result<(), CollabError> {
    info!(
        "Update message received for document {}: editor={}, cell={}!{}_{}",
        update_msg.document_id, update_msg.editor_id, update_msg.sheet_name, update_msg.row, update_msg.col
    );
    service.update_cell(conn.conn_id, update_msg, now).await
}

/// Handle SwitchSheetMessage
pub async fn handle_switch_sheet_message(
    switch_msg: &SwitchSheetMessage,
    conn: &ConnCtx,
    service: &CollabService,
    now: DateTime<Utc>,
) -> Result<(), CollabError> {
    service.switch_sheet(conn.conn_id, switch_msg, now).await
}
