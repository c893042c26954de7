use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::services::collab_service::CollabService;

/// Periodic reclamation of stale presence and stale locks.
///
/// Both loops go through the registry and take each session's lock like live
/// traffic does, so a sweep never races a refresh of the same session.
pub struct Janitor {
    handles: Vec<JoinHandle<()>>,
}

impl Janitor {
    pub fn spawn(service: Arc<CollabService>, lock_every: Duration, presence_every: Duration) -> Self {
        info!(
            "Janitor started: lock sweep every {:?}, presence sweep every {:?}",
            lock_every, presence_every
        );
        let handles = vec![
            tokio::spawn(run_lock_sweeps(service.clone(), lock_every)),
            tokio::spawn(run_presence_sweeps(service, presence_every)),
        ];
        Self { handles }
    }

    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

async fn run_lock_sweeps(service: Arc<CollabService>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let released = service.sweep_locks(Utc::now()).await;
        if released > 0 {
            info!("Lock sweep released {} expired lock(s)", released);
        } else {
            debug!("Lock sweep found nothing to release");
        }
    }
}

async fn run_presence_sweeps(service: Arc<CollabService>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let evicted = service.sweep_presence(Utc::now()).await;
        if evicted > 0 {
            info!("Presence sweep removed {} inactive editor(s)", evicted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Collaborators;
    use crate::models::{CellRef, JoinMessage, LockCellMessage, SendMessage};
    use crate::services::collab_service::tests::backend;
    use crate::ws::registry::RoomRegistry;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn expired_lock_is_released_on_next_sweep() {
        let backend = backend();
        // Every lock is already past a zero TTL
        let service = Arc::new(CollabService::new(
            Arc::new(RoomRegistry::new(chrono::Duration::zero())),
            Collaborators::from_shared(backend),
            chrono::Duration::minutes(5),
            Duration::from_secs(300),
        ));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::new_v4();
        let join = JoinMessage {
            document_id: "doc1".to_string(),
            editor_id: "A".to_string(),
            username: None,
            share_token: None,
        };
        service.join(conn_id, &tx, &join, Utc::now()).await.unwrap();
        let lock = LockCellMessage {
            document_id: "doc1".to_string(),
            editor_id: "A".to_string(),
            cell: CellRef::new(4, 2),
            share_token: None,
        };
        service.lock_cell(conn_id, &lock, Utc::now()).await.unwrap();
        while rx.try_recv().is_ok() {}

        let janitor = Janitor::spawn(service.clone(), Duration::from_secs(30), Duration::from_secs(300));

        match rx.recv().await {
            Some(SendMessage::CellUnlocked(m)) => {
                assert_eq!(m.cell, CellRef::new(4, 2));
                assert_eq!(m.editor_id, "A");
            }
            other => panic!("unexpected message {:?}", other),
        }
        janitor.shutdown();
    }
}
