use std::collections::HashMap;
use uuid::Uuid;

use crate::models::SendMessage;
use super::docsession::{ConnId, Outbox};

/// State owned by one WebSocket connection.
#[derive(Clone, Debug)]
pub struct ConnCtx {
    pub conn_id: ConnId,
    pub outbox: Outbox,
    /// document id -> editor id this connection joined as
    joined: HashMap<String, String>,
}

impl ConnCtx {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            outbox,
            joined: HashMap::new(),
        }
    }

    pub fn remember_join(&mut self, document_id: &str, editor_id: &str) {
        self.joined.insert(document_id.to_string(), editor_id.to_string());
    }

    pub fn forget(&mut self, document_id: &str) -> Option<String> {
        self.joined.remove(document_id)
    }

    pub fn editor_for(&self, document_id: &str) -> Option<&str> {
        self.joined.get(document_id).map(String::as_str)
    }

    pub fn joined_documents(&self) -> Vec<(String, String)> {
        self.joined
            .iter()
            .map(|(doc, editor)| (doc.clone(), editor.clone()))
            .collect()
    }

    /// Reply to this connection only.
    pub fn send(&self, msg: SendMessage) -> bool {
        self.outbox.send(msg).is_ok()
    }
}
