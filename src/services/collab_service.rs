use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use crate::clients::{Collaborators, ContentLoader, FilePersistence};
use crate::models::{
    CellLockedMessage, CellUnlockedMessage, CellUpdateMessage, CellUpdatedMessage, CollabError,
    EditorInfo, JoinMessage, LockCellMessage, LockRejectedMessage, SaveNotificationMessage,
    SaveRequestMessage, SaveSuccessMessage, SendMessage, SheetSwitchedMessage,
    SwitchSheetMessage, SyncDataMessage, UnlockCellMessage, UserJoinedMessage,
};
use crate::services::permission_service::PermissionService;
use crate::ws::cell_locks::LockOutcome;
use crate::ws::connctx::ConnCtx;
use crate::ws::docsession::{ConnId, DocSession, Outbox};
use crate::ws::registry::RoomRegistry;
use crate::ws::userctx::UserCtxCache;

/// The real-time collaboration engine.
///
/// Every mutation of a document happens while holding that document's
/// session lock. Permission checks and name lookups happen before the lock
/// is taken; a failing operation leaves the session untouched.
pub struct CollabService {
    registry: Arc<RoomRegistry>,
    permissions: PermissionService,
    users: UserCtxCache,
    loader: Arc<dyn ContentLoader>,
    persistence: Arc<dyn FilePersistence>,
    presence_idle: Duration,
}

impl CollabService {
    pub fn new(
        registry: Arc<RoomRegistry>,
        collaborators: Collaborators,
        presence_idle: Duration,
        user_cache_ttl: std::time::Duration,
    ) -> Self {
        Self {
            registry,
            permissions: PermissionService::new(collaborators.permissions),
            users: UserCtxCache::new(collaborators.users, user_cache_ttl),
            loader: collaborators.loader,
            persistence: collaborators.persistence,
            presence_idle,
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub fn user_ctx_count(&self) -> u64 {
        self.users.entry_count()
    }

    async fn resolve_username(&self, editor_id: &str, announced: Option<&str>) -> Result<String, CollabError> {
        // A self-announced name is used for this join only, never cached
        if let Some(username) = announced.filter(|name| !name.trim().is_empty()) {
            return Ok(username.to_string());
        }
        match self.users.get_or_fetch_username(editor_id).await {
            Ok(Some(username)) => Ok(username),
            Ok(None) => Err(CollabError::NotFound(format!("editor {}", editor_id))),
            Err(e) => Err(CollabError::Transient(format!("user directory: {}", e))),
        }
    }

    async fn require_write(
        &self,
        editor_id: &str,
        document_id: &str,
        share_token: Option<&str>,
    ) -> Result<(), CollabError> {
        if self.permissions.can_write(editor_id, document_id, share_token).await {
            Ok(())
        } else {
            Err(CollabError::PermissionDenied(format!(
                "editor {} cannot edit document {}",
                editor_id, document_id
            )))
        }
    }

    /// Lock the session of a document the connection joined as `editor_id`.
    async fn member_session(
        &self,
        conn_id: ConnId,
        document_id: &str,
        editor_id: &str,
    ) -> Result<OwnedMutexGuard<DocSession>, CollabError> {
        let session = self
            .registry
            .get(document_id)
            .await
            .ok_or_else(|| CollabError::NotFound(format!("document {}", document_id)))?;
        let guard = session.lock_owned().await;
        if !guard.is_member(conn_id, editor_id) {
            return Err(CollabError::NotFound(format!(
                "editor {} in document {}",
                editor_id, document_id
            )));
        }
        Ok(guard)
    }

    /// Admit an editor with write permission to a document's room.
    ///
    /// The first editor of a session loads the grid snapshot. The room gets
    /// `user_joined`, then the joining connection gets `sync_data`.
    pub async fn join(
        &self,
        conn_id: ConnId,
        outbox: &Outbox,
        msg: &JoinMessage,
        now: DateTime<Utc>,
    ) -> Result<(), CollabError> {
        let document_id = msg.document_id.as_str();
        let editor_id = msg.editor_id.as_str();

        let share_token = msg.share_token.as_deref();
        if !self.permissions.can_write(editor_id, document_id, share_token).await {
            let reason = if self.permissions.can_read(editor_id, document_id, share_token).await {
                format!("editor {} has read-only access to document {}", editor_id, document_id)
            } else {
                format!("editor {} cannot open document {}", editor_id, document_id)
            };
            return Err(CollabError::PermissionDenied(reason));
        }
        let username = self.resolve_username(editor_id, msg.username.as_deref()).await?;

        loop {
            let session = self.registry.get_or_create(document_id).await;
            let mut s = session.lock().await;

            // Lost a race with remove_if_empty, go get the fresh session
            if s.is_closed() {
                continue;
            }

            if s.needs_content() {
                match self.loader.load_snapshot(document_id).await {
                    Ok(content) => {
                        let content = content.unwrap_or_default();
                        debug!(
                            "Loaded document {} with {} cell(s) in sheets [{}]",
                            document_id,
                            content.cell_count(),
                            content.sheet_names().collect::<Vec<_>>().join(", ")
                        );
                        s.set_content(content);
                    }
                    Err(e) => {
                        error!("Failed to load content of document {}: {}", document_id, e);
                        drop(s);
                        self.registry.remove_if_empty(document_id).await;
                        return Err(CollabError::Transient(format!(
                            "could not load document {}",
                            document_id
                        )));
                    }
                }
            }

            s.attach(conn_id, editor_id, &username, outbox.clone(), now);
            s.publish(
                SendMessage::UserJoined(UserJoinedMessage {
                    document_id: document_id.to_string(),
                    editor_id: editor_id.to_string(),
                    username: username.clone(),
                    editors: s.editors_map(),
                    can_write: true,
                    current_user: EditorInfo {
                        editor_id: editor_id.to_string(),
                        username: username.clone(),
                    },
                }),
                None,
            );
            s.send_to(
                conn_id,
                SendMessage::SyncData(SyncDataMessage {
                    document_id: document_id.to_string(),
                    content: s.content().clone(),
                }),
            );

            info!(
                "Editor {} ({}) joined document {}, {} editor(s) present",
                editor_id,
                username,
                document_id,
                s.editor_count()
            );
            return Ok(());
        }
    }

    /// Explicit leave: the editor and all its locks leave the room.
    pub async fn leave(&self, conn_id: ConnId, document_id: &str, editor_id: &str) -> Result<(), CollabError> {
        {
            let mut s = self.member_session(conn_id, document_id, editor_id).await?;
            if let Some(presence) = s.evict(editor_id) {
                info!("Editor {} ({}) left document {}", editor_id, presence.username, document_id);
            }
        }
        self.registry.remove_if_empty(document_id).await;
        Ok(())
    }

    /// Leave every room the connection joined. Returns the number of editors
    /// that left as a result.
    pub async fn disconnect(&self, conn: &ConnCtx) -> usize {
        let mut departed = 0;
        for (document_id, editor_id) in conn.joined_documents() {
            let Some(session) = self.registry.get(&document_id).await else {
                continue;
            };
            {
                let mut s = session.lock().await;
                if s.detach(conn.conn_id).is_some() {
                    info!("Editor {} disconnected from document {}", editor_id, document_id);
                    departed += 1;
                }
            }
            self.registry.remove_if_empty(&document_id).await;
        }
        departed
    }

    pub async fn lock_cell(
        &self,
        conn_id: ConnId,
        msg: &LockCellMessage,
        now: DateTime<Utc>,
    ) -> Result<LockOutcome, CollabError> {
        self.require_write(&msg.editor_id, &msg.document_id, msg.share_token.as_deref())
            .await?;
        let mut s = self.member_session(conn_id, &msg.document_id, &msg.editor_id).await?;

        let username = s
            .editor(&msg.editor_id)
            .map(|p| p.username.clone())
            .unwrap_or_else(|| msg.editor_id.clone());
        let outcome = s.acquire_lock(&msg.cell, &msg.editor_id, &username, now);
        s.touch(&msg.editor_id, now);

        if let LockOutcome::Reclaimed { previous } = &outcome {
            info!(
                "Cell {} of document {} reclaimed from {} by {}",
                msg.cell, msg.document_id, previous.editor_id, msg.editor_id
            );
        }
        if outcome.is_new_grant() {
            s.publish(
                SendMessage::CellLocked(CellLockedMessage {
                    document_id: msg.document_id.clone(),
                    cell: msg.cell.clone(),
                    editor_id: msg.editor_id.clone(),
                    username,
                }),
                None,
            );
        } else if let LockOutcome::Rejected { holder } = &outcome {
            s.send_to(
                conn_id,
                SendMessage::LockRejected(LockRejectedMessage {
                    document_id: msg.document_id.clone(),
                    cell: msg.cell.clone(),
                    holder_username: holder.username.clone(),
                }),
            );
        }
        Ok(outcome)
    }

    /// Release a cell. Anything but the holder releasing is silently ignored.
    pub async fn unlock_cell(&self, conn_id: ConnId, msg: &UnlockCellMessage, now: DateTime<Utc>) -> bool {
        let Ok(mut s) = self.member_session(conn_id, &msg.document_id, &msg.editor_id).await else {
            return false;
        };
        s.touch(&msg.editor_id, now);
        if !s.release_lock(&msg.cell, &msg.editor_id) {
            if let Some(holder) = s.lock_holder(&msg.cell, now) {
                debug!(
                    "Cell {} of document {} stays locked by {}",
                    msg.cell, msg.document_id, holder.editor_id
                );
            }
            return false;
        }
        s.publish(
            SendMessage::CellUnlocked(CellUnlockedMessage {
                document_id: msg.document_id.clone(),
                cell: msg.cell.clone(),
                editor_id: msg.editor_id.clone(),
            }),
            None,
        );
        true
    }

    pub async fn update_cell(
        &self,
        conn_id: ConnId,
        msg: &CellUpdateMessage,
        now: DateTime<Utc>,
    ) -> Result<(), CollabError> {
        self.require_write(&msg.editor_id, &msg.document_id, msg.share_token.as_deref())
            .await?;
        let mut s = self.member_session(conn_id, &msg.document_id, &msg.editor_id).await?;

        s.update_cell(&msg.sheet_name, msg.row, msg.col, msg.value.clone());
        s.touch(&msg.editor_id, now);
        s.publish(
            SendMessage::CellUpdated(CellUpdatedMessage {
                document_id: msg.document_id.clone(),
                sheet_name: msg.sheet_name.clone(),
                row: msg.row,
                col: msg.col,
                value: msg.value.clone(),
                editor_id: msg.editor_id.clone(),
            }),
            Some(conn_id),
        );
        Ok(())
    }

    pub async fn switch_sheet(
        &self,
        conn_id: ConnId,
        msg: &SwitchSheetMessage,
        now: DateTime<Utc>,
    ) -> Result<(), CollabError> {
        let mut s = self.member_session(conn_id, &msg.document_id, &msg.editor_id).await?;
        s.touch(&msg.editor_id, now);
        s.publish(
            SendMessage::SheetSwitched(SheetSwitchedMessage {
                document_id: msg.document_id.clone(),
                sheet_name: msg.sheet_name.clone(),
                editor_id: msg.editor_id.clone(),
            }),
            Some(conn_id),
        );
        Ok(())
    }

    /// Announce a save to the room and hand the buffered content to file
    /// persistence in the background. The requester hears back with
    /// `save_success` or `error`.
    pub async fn request_save(
        &self,
        conn_id: ConnId,
        outbox: &Outbox,
        msg: &SaveRequestMessage,
        now: DateTime<Utc>,
    ) -> Result<(), CollabError> {
        self.require_write(&msg.editor_id, &msg.document_id, msg.share_token.as_deref())
            .await?;
        let content = {
            let mut s = self.member_session(conn_id, &msg.document_id, &msg.editor_id).await?;
            s.touch(&msg.editor_id, now);
            let username = s
                .editor(&msg.editor_id)
                .map(|p| p.username.clone())
                .unwrap_or_else(|| msg.editor_id.clone());
            s.publish(
                SendMessage::SaveNotification(SaveNotificationMessage {
                    document_id: msg.document_id.clone(),
                    editor_id: msg.editor_id.clone(),
                    username,
                }),
                None,
            );
            s.content().clone()
        };

        let persistence = self.persistence.clone();
        let document_id = msg.document_id.clone();
        let editor_id = msg.editor_id.clone();
        let outbox = outbox.clone();
        tokio::spawn(async move {
            let reply = match persistence.save(&document_id, &editor_id, &content).await {
                Ok(()) => SendMessage::SaveSuccess(SaveSuccessMessage {
                    document_id: document_id.clone(),
                }),
                Err(e) => {
                    error!("Failed to save document {}: {}", document_id, e);
                    SendMessage::error(Some(&document_id), "Save failed")
                }
            };
            // The requester may be gone by now
            let _ = outbox.send(reply);
        });
        Ok(())
    }

    /// Keepalive: refresh the editor's activity in every joined room.
    pub async fn touch_connection(&self, conn: &ConnCtx, now: DateTime<Utc>) {
        for (document_id, editor_id) in conn.joined_documents() {
            if let Ok(mut s) = self.member_session(conn.conn_id, &document_id, &editor_id).await {
                s.touch(&editor_id, now);
            }
        }
    }

    /// Force out editors idle for longer than the presence threshold.
    pub async fn sweep_presence(&self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        for (document_id, session) in self.registry.sessions().await {
            {
                let mut s = session.lock().await;
                for editor_id in s.stale_editors(now, self.presence_idle) {
                    if let Some(presence) = s.evict(&editor_id) {
                        warn!(
                            "Removed inactive editor {} ({}) from document {}",
                            editor_id, presence.username, document_id
                        );
                        evicted += 1;
                    }
                }
            }
            self.registry.remove_if_empty(&document_id).await;
        }
        evicted
    }

    /// Release every lock that reached its TTL and tell the room.
    pub async fn sweep_locks(&self, now: DateTime<Utc>) -> usize {
        let mut released = 0;
        for (document_id, session) in self.registry.sessions().await {
            let mut s = session.lock().await;
            for (cell, lock) in s.expire_locks(now) {
                info!(
                    "Lock on cell {} of document {} held by {} expired",
                    cell, document_id, lock.editor_id
                );
                s.publish(
                    SendMessage::CellUnlocked(CellUnlockedMessage {
                        document_id: document_id.clone(),
                        cell,
                        editor_id: lock.editor_id,
                    }),
                    None,
                );
                released += 1;
            }
        }
        released
    }
}
