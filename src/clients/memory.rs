//! In-memory collaborators for tests.

use futures_util::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::models::GridContent;
use super::{ClientError, ContentLoader, FilePersistence, PermissionDecision, PermissionOracle, UserDirectory};

#[derive(Default)]
pub struct MemoryBackend {
    writers: Mutex<HashSet<(String, String)>>,
    share_tokens: Mutex<HashMap<String, (String, bool)>>,
    usernames: Mutex<HashMap<String, String>>,
    snapshots: Mutex<HashMap<String, GridContent>>,
    saved: Mutex<Vec<(String, String, GridContent)>>,
    pub permission_checks: Mutex<usize>,
    pub fail_loads: AtomicBool,
    pub panic_loads: AtomicBool,
    pub fail_saves: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, editor_id: &str, username: &str) {
        self.usernames.lock().unwrap().insert(editor_id.to_string(), username.to_string());
    }

    pub fn grant_write(&self, editor_id: &str, document_id: &str) {
        self.writers
            .lock()
            .unwrap()
            .insert((editor_id.to_string(), document_id.to_string()));
    }

    pub fn revoke_write(&self, editor_id: &str, document_id: &str) {
        self.writers
            .lock()
            .unwrap()
            .remove(&(editor_id.to_string(), document_id.to_string()));
    }

    pub fn add_share_token(&self, token: &str, document_id: &str, can_write: bool) {
        self.share_tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), (document_id.to_string(), can_write));
    }

    pub fn put_snapshot(&self, document_id: &str, content: GridContent) {
        self.snapshots.lock().unwrap().insert(document_id.to_string(), content);
    }

    pub fn saved(&self) -> Vec<(String, String, GridContent)> {
        self.saved.lock().unwrap().clone()
    }

    fn decide(&self, editor_id: &str, document_id: &str, share_token: Option<&str>) -> PermissionDecision {
        *self.permission_checks.lock().unwrap() += 1;
        if let Some(token) = share_token {
            return match self.share_tokens.lock().unwrap().get(token) {
                Some((doc, can_write)) if doc == document_id => PermissionDecision {
                    can_read: true,
                    can_write: *can_write,
                },
                _ => PermissionDecision::default(),
            };
        }
        let can_write = self
            .writers
            .lock()
            .unwrap()
            .contains(&(editor_id.to_string(), document_id.to_string()));
        PermissionDecision {
            can_read: can_write,
            can_write,
        }
    }
}

impl PermissionOracle for MemoryBackend {
    fn check<'a>(
        &'a self,
        editor_id: &'a str,
        document_id: &'a str,
        share_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<PermissionDecision, ClientError>> {
        let decision = self.decide(editor_id, document_id, share_token);
        async move { Ok(decision) }.boxed()
    }
}

impl UserDirectory for MemoryBackend {
    fn username<'a>(&'a self, editor_id: &'a str) -> BoxFuture<'a, Result<Option<String>, ClientError>> {
        let username = self.usernames.lock().unwrap().get(editor_id).cloned();
        async move { Ok(username) }.boxed()
    }
}

impl ContentLoader for MemoryBackend {
    fn load_snapshot<'a>(&'a self, document_id: &'a str) -> BoxFuture<'a, Result<Option<GridContent>, ClientError>> {
        if self.panic_loads.load(Ordering::SeqCst) {
            panic!("content loader blew up on {}", document_id);
        }
        let result = if self.fail_loads.load(Ordering::SeqCst) {
            Err(ClientError::Unavailable("content store offline".to_string()))
        } else {
            Ok(self.snapshots.lock().unwrap().get(document_id).cloned())
        };
        async move { result }.boxed()
    }
}

impl FilePersistence for MemoryBackend {
    fn save<'a>(
        &'a self,
        document_id: &'a str,
        editor_id: &'a str,
        content: &'a GridContent,
    ) -> BoxFuture<'a, Result<(), ClientError>> {
        let result = if self.fail_saves.load(Ordering::SeqCst) {
            Err(ClientError::Unavailable("file store offline".to_string()))
        } else {
            self.saved.lock().unwrap().push((
                document_id.to_string(),
                editor_id.to_string(),
                content.clone(),
            ));
            Ok(())
        };
        async move { result }.boxed()
    }
}
