//! Standing query for the one in-progress session.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::store::{SessionStore, StoreEvent};
use crate::sync::{Snapshot, SyncConfig, Wake, Waker};
use crate::{Session, SessionId};

/// Watches for the in-progress session.
///
/// Delivers only when the identity of the active session changes (a new one
/// appears, or the tracked one stops being in progress). Dropping the
/// discovery aborts its task.
#[derive(Debug)]
pub struct Discovery {
    rx: watch::Receiver<Snapshot<Session>>,
    task: JoinHandle<()>,
}

impl Discovery {
    /// Starts the standing query. The first result is fetched immediately.
    #[instrument(skip(store, config))]
    pub fn spawn(store: Arc<dyn SessionStore>, config: &SyncConfig) -> Self {
        info!("Starting session discovery");
        let (tx, rx) = watch::channel(Snapshot::Pending);
        let waker = Waker::new(store.as_ref(), config);
        let task = tokio::spawn(run(store, waker, tx).instrument(info_span!("discovery")));
        Self { rx, task }
    }

    /// Waits for the next change in the active session.
    ///
    /// Yields `Some(None)` when no session is in progress. Returns `None`
    /// once the discovery task has stopped.
    pub async fn next(&mut self) -> Option<Option<Session>> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(found) = self.rx.borrow_and_update().clone().into_fetched() {
                return Some(found);
            }
        }
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        debug!("Stopping session discovery");
        self.task.abort();
    }
}

async fn run(store: Arc<dyn SessionStore>, mut waker: Waker, tx: watch::Sender<Snapshot<Session>>) {
    let mut current: Option<SessionId> = None;
    loop {
        match store.find_active().await {
            Ok(found) => {
                let found_id = found.as_ref().map(|s| s.id().clone());
                let first = matches!(*tx.borrow(), Snapshot::Pending);
                if first || found_id != current {
                    debug!(active = ?found_id, "Active session changed");
                    current = found_id;
                    tx.send_replace(match found {
                        Some(session) => Snapshot::Present(session),
                        None => Snapshot::Absent,
                    });
                }
            }
            Err(e) => warn!(error = %e, "Discovery query failed, retrying on next wake"),
        }

        // Moves on the active session cannot change which session is active,
        // except the one that ends it, which also emits `SessionUpdated`.
        loop {
            match waker.wait().await {
                Some(Wake::Event(StoreEvent::MoveAppended(_))) => continue,
                Some(_) => break,
                None => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, Word};

    fn word(s: &str) -> Word {
        Word::parse(s).expect("valid test word")
    }

    #[tokio::test]
    async fn test_discovery_reports_none_then_new_session() {
        let store = Arc::new(MemoryStore::new());
        let mut discovery = Discovery::spawn(store.clone(), &SyncConfig::events_only());
        assert_eq!(discovery.next().await, Some(None));

        let session = store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        let found = discovery.next().await.flatten().expect("active session");
        assert_eq!(found.id(), session.id());
    }

    #[tokio::test]
    async fn test_discovery_reports_end_of_session() {
        let store = Arc::new(MemoryStore::new());
        let session = store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        let mut discovery = Discovery::spawn(store.clone(), &SyncConfig::events_only());
        assert!(discovery.next().await.flatten().is_some());

        store
            .append_move(session.id(), &"bob".to_string(), word("crane"))
            .await
            .expect("append");
        assert_eq!(discovery.next().await, Some(None));
    }
}
