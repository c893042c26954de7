use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::models::{CollabError, LockCellMessage, UnlockCellMessage};
use crate::services::collab_service::CollabService;
use crate::ws::cell_locks::LockOutcome;
use crate::ws::connctx::ConnCtx;

/// Handle LockCellMessage
pub async fn handle_lock_message(
    lock_msg: &LockCellMessage,
    conn: &ConnCtx,
    service: &CollabService,
    now: DateTime<Utc>,
) -> Result<(), CollabError> {
    let outcome = service.lock_cell(conn.conn_id, lock_msg, now).await?;
    match outcome {
        LockOutcome::Rejected { holder } => info!(
            "Lock on cell {} of document {} refused to {}, held by {}",
            lock_msg.cell, lock_msg.document_id, lock_msg.editor_id, holder.editor_id
        ),
        outcome => debug!(
            "Lock on cell {} of document {} for {}: {:?}",
            lock_msg.cell, lock_msg.document_id, lock_msg.editor_id, outcome
        ),
    }
    Ok(())
}

/// Handle UnlockCellMessage. Never fails towards the client.
pub async fn handle_unlock_message(
    unlock_msg: &UnlockCellMessage,
    conn: &ConnCtx,
    service: &CollabService,
    now: DateTime<Utc>,
) -> Result<(), CollabError> {
    if !service.unlock_cell(conn.conn_id, unlock_msg, now).await {
        debug!(
            "Ignored unlock of cell {} in document {} by non-holder {}",
            unlock_msg.cell, unlock_msg.document_id, unlock_msg.editor_id
        );
    }
    Ok(())
}
