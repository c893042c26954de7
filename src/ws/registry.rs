use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use super::docsession::DocSession;

pub type SharedSession = Arc<Mutex<DocSession>>;

/// Owns one `DocSession` per document id.
///
/// The map lock is never held while waiting for a session lock, and a
/// session lock is never held while taking the map lock.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, SharedSession>>,
    lock_ttl: Duration,
}

impl RoomRegistry {
    pub fn new(lock_ttl: Duration) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            lock_ttl,
        }
    }

    /// Get the session of a document, creating an empty one if needed.
    pub async fn get_or_create(&self, document_id: &str) -> SharedSession {
        if let Some(session) = self.rooms.read().await.get(document_id) {
            return session.clone();
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(document_id.to_string())
            .or_insert_with(|| {
                info!("Opening session for document {}", document_id);
                Arc::new(Mutex::new(DocSession::new(document_id, self.lock_ttl)))
            })
            .clone()
    }

    pub async fn get(&self, document_id: &str) -> Option<SharedSession> {
        self.rooms.read().await.get(document_id).cloned()
    }

    /// Drop a session without editors.
    ///
    /// A session that is busy is left alone; whoever holds it either keeps it
    /// populated or calls this again, and the presence sweep retries anyway.
    pub async fn remove_if_empty(&self, document_id: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(session) = rooms.get(document_id).cloned() else {
            return false;
        };
        let Ok(mut guard) = session.try_lock() else {
            return false;
        };
        if !guard.is_empty() {
            return false;
        }
        guard.close();
        rooms.remove(document_id);
        info!("Closed session for document {}", document_id);
        true
    }

    /// Snapshot of all live sessions.
    pub async fn sessions(&self) -> Vec<(String, SharedSession)> {
        self.rooms
            .read()
            .await
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }
}
