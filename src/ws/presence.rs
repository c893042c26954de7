use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use crate::models::EditorsMap;

#[derive(Clone, Debug, PartialEq)]
pub struct EditorPresence {
    pub editor_id: String,
    pub username: String,
    pub last_active: DateTime<Utc>,
}

/// Editors currently joined to one document, with their liveness.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    editors: HashMap<String, EditorPresence>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh an editor. Returns true if the editor was not present before.
    pub fn join(&mut self, editor_id: &str, username: &str, now: DateTime<Utc>) -> bool {
        self.editors
            .insert(
                editor_id.to_string(),
                EditorPresence {
                    editor_id: editor_id.to_string(),
                    username: username.to_string(),
                    last_active: now,
                },
            )
            .is_none()
    }

    pub fn leave(&mut self, editor_id: &str) -> Option<EditorPresence> {
        self.editors.remove(editor_id)
    }

    pub fn touch(&mut self, editor_id: &str, now: DateTime<Utc>) -> bool {
        match self.editors.get_mut(editor_id) {
            Some(presence) => {
                presence.last_active = now;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, editor_id: &str) -> Option<&EditorPresence> {
        self.editors.get(editor_id)
    }

    pub fn contains(&self, editor_id: &str) -> bool {
        self.editors.contains_key(editor_id)
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    pub fn editors_map(&self) -> EditorsMap {
        self.editors
            .values()
            .map(|p| (p.editor_id.clone(), p.username.clone()))
            .collect()
    }

    /// Editors whose last activity is more than `idle` before `now`.
    pub fn stale(&self, now: DateTime<Utc>, idle: Duration) -> Vec<String> {
        let mut stale: Vec<String> = self
            .editors
            .values()
            .filter(|p| now - p.last_active > idle)
            .map(|p| p.editor_id.clone())
            .collect();
        stale.sort();
        stale
    }
}
