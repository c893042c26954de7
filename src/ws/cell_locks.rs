use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use crate::models::CellRef;

/// Current holder of a cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellLock {
    pub editor_id: String,
    pub username: String,
    pub acquired_at: DateTime<Utc>,
}

impl CellLock {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.acquired_at >= ttl
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LockOutcome {
    /// The cell was free.
    Granted,
    /// The requester already held the cell; its timestamp was renewed.
    Refreshed,
    /// Another editor held the cell past the TTL and lost it.
    Reclaimed { previous: CellLock },
    /// Another editor holds a live lock. Nothing changed.
    Rejected { holder: CellLock },
}

impl LockOutcome {
    /// True when the room must be told about a new holder.
    pub fn is_new_grant(&self) -> bool {
        matches!(self, LockOutcome::Granted | LockOutcome::Reclaimed { .. })
    }
}

/// Per-cell locks of one document.
///
/// A lock whose age reached the TTL is treated as absent by `acquire` and
/// `holder`, even if no sweep removed it yet.
#[derive(Debug)]
pub struct LockTable {
    ttl: Duration,
    locks: HashMap<CellRef, CellLock>,
}

impl LockTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            locks: HashMap::new(),
        }
    }

    /// Grant, refresh or reject; never waits.
    pub fn acquire(
        &mut self,
        cell: &CellRef,
        editor_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> LockOutcome {
        let previous = match self.locks.get_mut(cell) {
            Some(lock) if lock.editor_id == editor_id => {
                lock.acquired_at = now;
                return LockOutcome::Refreshed;
            }
            Some(lock) if !lock.is_expired(now, self.ttl) => {
                return LockOutcome::Rejected { holder: lock.clone() };
            }
            Some(lock) => Some(lock.clone()),
            None => None,
        };

        self.locks.insert(
            cell.clone(),
            CellLock {
                editor_id: editor_id.to_string(),
                username: username.to_string(),
                acquired_at: now,
            },
        );

        match previous {
            Some(previous) => LockOutcome::Reclaimed { previous },
            None => LockOutcome::Granted,
        }
    }

    /// Release a cell if `editor_id` holds it. Returns whether anything changed.
    pub fn release(&mut self, cell: &CellRef, editor_id: &str) -> bool {
        match self.locks.get(cell) {
            Some(lock) if lock.editor_id == editor_id => {
                self.locks.remove(cell);
                true
            }
            _ => false,
        }
    }

    /// Release every cell held by `editor_id`.
    pub fn release_all(&mut self, editor_id: &str) -> Vec<CellRef> {
        let mut released: Vec<CellRef> = self
            .locks
            .iter()
            .filter(|(_, lock)| lock.editor_id == editor_id)
            .map(|(cell, _)| cell.clone())
            .collect();
        released.sort();
        for cell in &released {
            self.locks.remove(cell);
        }
        released
    }

    /// Drop every lock whose age reached the TTL.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Vec<(CellRef, CellLock)> {
        let ttl = self.ttl;
        let mut expired: Vec<(CellRef, CellLock)> = self
            .locks
            .iter()
            .filter(|(_, lock)| lock.is_expired(now, ttl))
            .map(|(cell, lock)| (cell.clone(), lock.clone()))
            .collect();
        expired.sort_by(|a, b| a.0.cmp(&b.0));
        for (cell, _) in &expired {
            self.locks.remove(cell);
        }
        expired
    }

    /// Live holder of a cell.
    pub fn holder(&self, cell: &CellRef, now: DateTime<Utc>) -> Option<&CellLock> {
        self.locks
            .get(cell)
            .filter(|lock| !lock.is_expired(now, self.ttl))
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
