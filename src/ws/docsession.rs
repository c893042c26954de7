use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{
    CellRef, CellUnlockedMessage, EditorsMap, GridContent, SendMessage, UserLeftMessage,
};
use super::cell_locks::{CellLock, LockOutcome, LockTable};
use super::presence::{EditorPresence, PresenceTracker};

pub type ConnId = Uuid;

/// Outgoing queue of one connection. Sending never blocks.
pub type Outbox = mpsc::UnboundedSender<SendMessage>;

#[derive(Debug)]
struct Member {
    editor_id: String,
    outbox: Outbox,
}

/// In-memory collaboration state of one document.
///
/// Callers hold the session mutex for the whole of an operation, so every
/// method here sees a consistent state and messages leave in publish order.
#[derive(Debug)]
pub struct DocSession {
    document_id: String,
    presence: PresenceTracker,
    locks: LockTable,
    content: GridContent,
    content_loaded: bool,
    members: HashMap<ConnId, Member>,
    closed: bool,
}

impl DocSession {
    pub fn new(document_id: &str, lock_ttl: Duration) -> Self {
        Self {
            document_id: document_id.to_string(),
            presence: PresenceTracker::new(),
            locks: LockTable::new(lock_ttl),
            content: GridContent::new(),
            content_loaded: false,
            members: HashMap::new(),
            closed: false,
        }
    }

    /// A closed session was dropped from the registry and must not be joined.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_empty(&self) -> bool {
        self.presence.is_empty()
    }

    pub fn needs_content(&self) -> bool {
        !self.content_loaded
    }

    pub fn set_content(&mut self, content: GridContent) {
        self.content = content;
        self.content_loaded = true;
    }

    pub fn content(&self) -> &GridContent {
        &self.content
    }

    pub fn update_cell(&mut self, sheet_name: &str, row: u32, col: u32, value: Value) {
        self.content.set_cell(sheet_name, row, col, value);
    }

    pub fn editor(&self, editor_id: &str) -> Option<&EditorPresence> {
        self.presence.get(editor_id)
    }

    pub fn editors_map(&self) -> EditorsMap {
        self.presence.editors_map()
    }

    pub fn editor_count(&self) -> usize {
        self.presence.len()
    }

    pub fn connection_count(&self) -> usize {
        self.members.len()
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Join `conn_id` to the room as `editor_id`.
    pub fn attach(
        &mut self,
        conn_id: ConnId,
        editor_id: &str,
        username: &str,
        outbox: Outbox,
        now: DateTime<Utc>,
    ) {
        self.presence.join(editor_id, username, now);
        self.members.insert(
            conn_id,
            Member {
                editor_id: editor_id.to_string(),
                outbox,
            },
        );
    }

    /// True if `conn_id` joined this room as `editor_id`.
    pub fn is_member(&self, conn_id: ConnId, editor_id: &str) -> bool {
        self.members
            .get(&conn_id)
            .is_some_and(|m| m.editor_id == editor_id)
            && self.presence.contains(editor_id)
    }

    pub fn touch(&mut self, editor_id: &str, now: DateTime<Utc>) {
        self.presence.touch(editor_id, now);
    }

    /// Drop one connection. The editor is evicted only when this was its
    /// last connection to the room.
    pub fn detach(&mut self, conn_id: ConnId) -> Option<EditorPresence> {
        let member = self.members.remove(&conn_id)?;
        let still_connected = self
            .members
            .values()
            .any(|m| m.editor_id == member.editor_id);
        if still_connected {
            return None;
        }
        self.evict(&member.editor_id)
    }

    /// Remove an editor with all of its connections and locks, telling the
    /// rest of the room.
    pub fn evict(&mut self, editor_id: &str) -> Option<EditorPresence> {
        let presence = self.presence.leave(editor_id)?;
        self.members.retain(|_, m| m.editor_id != editor_id);

        // An empty room starts over from the stored snapshot
        if self.presence.is_empty() {
            self.content = GridContent::new();
            self.content_loaded = false;
        }

        for cell in self.locks.release_all(editor_id) {
            self.publish(
                SendMessage::CellUnlocked(CellUnlockedMessage {
                    document_id: self.document_id.clone(),
                    cell,
                    editor_id: editor_id.to_string(),
                }),
                None,
            );
        }

        self.publish(
            SendMessage::UserLeft(UserLeftMessage {
                document_id: self.document_id.clone(),
                editor_id: presence.editor_id.clone(),
                username: presence.username.clone(),
                editors: self.presence.editors_map(),
            }),
            None,
        );
        Some(presence)
    }

    /// Editors idle for longer than `idle`.
    pub fn stale_editors(&self, now: DateTime<Utc>, idle: Duration) -> Vec<String> {
        self.presence.stale(now, idle)
    }

    pub fn acquire_lock(
        &mut self,
        cell: &CellRef,
        editor_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> LockOutcome {
        self.locks.acquire(cell, editor_id, username, now)
    }

    pub fn release_lock(&mut self, cell: &CellRef, editor_id: &str) -> bool {
        self.locks.release(cell, editor_id)
    }

    pub fn expire_locks(&mut self, now: DateTime<Utc>) -> Vec<(CellRef, CellLock)> {
        self.locks.expire(now)
    }

    pub fn lock_holder(&self, cell: &CellRef, now: DateTime<Utc>) -> Option<&CellLock> {
        self.locks.holder(cell, now)
    }

    /// Deliver to every joined connection except `exclude`.
    ///
    /// Best effort: a closed outbox just misses the message.
    pub fn publish(&self, msg: SendMessage, exclude: Option<ConnId>) -> usize {
        let mut delivered = 0;
        for (conn_id, member) in &self.members {
            if Some(*conn_id) == exclude {
                continue;
            }
            if member.outbox.send(msg.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver to a single joined connection.
    pub fn send_to(&self, conn_id: ConnId, msg: SendMessage) -> bool {
        self.members
            .get(&conn_id)
            .is_some_and(|m| m.outbox.send(msg).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn conn() -> (ConnId, Outbox, UnboundedReceiver<SendMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Uuid::new_v4(), tx, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<SendMessage>) -> Vec<SendMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn publish_skips_the_excluded_connection() {
        let mut session = DocSession::new("doc1", Duration::seconds(30));
        let (a, a_tx, mut a_rx) = conn();
        let (b, b_tx, mut b_rx) = conn();
        session.attach(a, "A", "Alice", a_tx, t0());
        session.attach(b, "B", "Bob", b_tx, t0());

        let delivered = session.publish(SendMessage::error(Some("doc1"), "x"), Some(a));

        assert_eq!(delivered, 1);
        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(drain(&mut b_rx).len(), 1);
    }

    #[test]
    fn evict_releases_locks_and_announces_departure() {
        let mut session = DocSession::new("doc1", Duration::seconds(30));
        let (a, a_tx, _a_rx) = conn();
        let (b, b_tx, mut b_rx) = conn();
        session.attach(a, "A", "Alice", a_tx, t0());
        session.attach(b, "B", "Bob", b_tx, t0());
        session.acquire_lock(&CellRef::new(0, 0), "A", "Alice", t0());

        let gone = session.evict("A").unwrap();

        assert_eq!(gone.username, "Alice");
        assert_eq!(session.lock_count(), 0);
        assert!(!session.is_member(a, "A"));
        let msgs = drain(&mut b_rx);
        assert!(matches!(&msgs[0], SendMessage::CellUnlocked(m) if m.editor_id == "A"));
        match &msgs[1] {
            SendMessage::UserLeft(m) => {
                assert_eq!(m.editor_id, "A");
                assert_eq!(m.editors.keys().collect::<Vec<_>>(), vec!["B"]);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn last_eviction_drops_the_buffered_content() {
        let mut session = DocSession::new("doc1", Duration::seconds(30));
        let (a, a_tx, _a_rx) = conn();
        let (b, b_tx, _b_rx) = conn();
        session.set_content(GridContent::new());
        session.attach(a, "A", "Alice", a_tx, t0());
        session.attach(b, "B", "Bob", b_tx, t0());
        session.update_cell("Sheet1", 0, 0, Value::from("draft"));

        session.evict("A");
        assert!(!session.needs_content());
        assert_eq!(session.content().cell_count(), 1);

        session.evict("B");
        assert!(session.needs_content());
        assert!(session.content().is_empty());
    }

    #[test]
    fn detach_keeps_editor_with_another_open_connection() {
        let mut session = DocSession::new("doc1", Duration::seconds(30));
        let (first, first_tx, _first_rx) = conn();
        let (second, second_tx, _second_rx) = conn();
        session.attach(first, "A", "Alice", first_tx, t0());
        session.attach(second, "A", "Alice", second_tx, t0());

        assert!(session.detach(first).is_none());
        assert!(session.is_member(second, "A"));
        assert!(session.detach(second).is_some());
        assert!(session.is_empty());
        assert_eq!(session.connection_count(), 0);
    }

    #[test]
    fn membership_is_bound_to_the_joined_editor() {
        let mut session = DocSession::new("doc1", Duration::seconds(30));
        let (a, a_tx, _a_rx) = conn();
        session.attach(a, "A", "Alice", a_tx, t0());

        assert!(session.is_member(a, "A"));
        assert!(!session.is_member(a, "B"));
        assert!(!session.is_member(Uuid::new_v4(), "A"));
    }
}
