//! Per-session subscriptions: the session record and its move log.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::store::{SessionStore, StoreError};
use crate::sync::{Snapshot, SyncConfig, Waker};
use crate::{Move, Session, SessionId};

/// A snapshot delivered by a [`SessionFeed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
    /// Full session record (status, roster, last player).
    Session(Session),
    /// Full move log, ordered by timestamp.
    Moves(Vec<Move>),
    /// The session no longer exists in the store.
    Removed,
}

/// Two standing subscriptions on one session.
///
/// Dropping the feed aborts both watcher tasks immediately.
#[derive(Debug)]
pub struct SessionFeed {
    session_id: SessionId,
    store: Arc<dyn SessionStore>,
    session_rx: watch::Receiver<Snapshot<Session>>,
    moves_rx: watch::Receiver<Snapshot<Vec<Move>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionFeed {
    /// Starts watching `session_id`. Both watchers fetch immediately.
    #[instrument(skip(store, config), fields(session_id = %session_id))]
    pub fn spawn(store: Arc<dyn SessionStore>, session_id: SessionId, config: &SyncConfig) -> Self {
        info!("Subscribing to session");
        let (session_tx, session_rx) = watch::channel(Snapshot::Pending);
        let (moves_tx, moves_rx) = watch::channel(Snapshot::Pending);

        let session_task = {
            let store = store.clone();
            let id = session_id.clone();
            let waker = Waker::new(store.as_ref(), config);
            tokio::spawn(
                async move {
                    watch_record(waker, session_tx, &id, |id| {
                        let store = store.clone();
                        async move { store.get_session(&id).await }
                    })
                    .await
                }
                .instrument(info_span!("session_watcher", session_id = %session_id)),
            )
        };

        let moves_task = {
            let store = store.clone();
            let id = session_id.clone();
            let waker = Waker::new(store.as_ref(), config);
            tokio::spawn(
                async move {
                    watch_record(waker, moves_tx, &id, |id| {
                        let store = store.clone();
                        async move { store.list_moves(&id).await }
                    })
                    .await
                }
                .instrument(info_span!("moves_watcher", session_id = %session_id)),
            )
        };

        Self {
            session_id,
            store,
            session_rx,
            moves_rx,
            tasks: vec![session_task, moves_task],
        }
    }

    /// The watched session.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Waits for the next changed snapshot.
    ///
    /// Returns `None` once both watchers have stopped.
    pub async fn next(&mut self) -> Option<FeedUpdate> {
        loop {
            let update = tokio::select! {
                changed = self.session_rx.changed() => match changed {
                    Ok(()) => match self.session_rx.borrow_and_update().clone() {
                        Snapshot::Pending => None,
                        Snapshot::Present(session) => Some(FeedUpdate::Session(session)),
                        Snapshot::Absent => Some(FeedUpdate::Removed),
                    },
                    Err(_) => return self.drain_moves().await,
                },
                changed = self.moves_rx.changed() => match changed {
                    Ok(()) => match self.moves_rx.borrow_and_update().clone() {
                        Snapshot::Pending => None,
                        Snapshot::Present(moves) => Some(FeedUpdate::Moves(moves)),
                        Snapshot::Absent => Some(FeedUpdate::Removed),
                    },
                    Err(_) => return self.drain_session().await,
                },
            };

            if let Some(update) = update {
                return Some(update);
            }
        }
    }

    async fn drain_moves(&mut self) -> Option<FeedUpdate> {
        self.moves_rx.changed().await.ok()?;
        match self.moves_rx.borrow_and_update().clone() {
            Snapshot::Present(moves) => Some(FeedUpdate::Moves(moves)),
            Snapshot::Absent => Some(FeedUpdate::Removed),
            Snapshot::Pending => None,
        }
    }

    async fn drain_session(&mut self) -> Option<FeedUpdate> {
        self.session_rx.changed().await.ok()?;
        match self.session_rx.borrow_and_update().clone() {
            Snapshot::Present(session) => Some(FeedUpdate::Session(session)),
            Snapshot::Absent => Some(FeedUpdate::Removed),
            Snapshot::Pending => None,
        }
    }

    /// One-shot re-fetch of the session, independent of the watchers.
    ///
    /// # Errors
    ///
    /// Returns the store error, including not-found if the session is gone.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn resync(&self) -> Result<Session, StoreError> {
        debug!("Resynchronizing session");
        self.store.get_session(&self.session_id).await
    }
}

impl Drop for SessionFeed {
    fn drop(&mut self) {
        debug!(session_id = %self.session_id, "Tearing down session feed");
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Fetch-publish-wait loop shared by both watchers.
///
/// Stops after publishing [`Snapshot::Absent`] or when the waker runs dry.
async fn watch_record<T, F, Fut>(
    mut waker: Waker,
    tx: watch::Sender<Snapshot<T>>,
    session_id: &SessionId,
    fetch: F,
) where
    T: Clone + PartialEq + Send + Sync,
    F: Fn(SessionId) -> Fut,
    Fut: std::future::Future<Output = Result<T, StoreError>>,
{
    loop {
        match fetch(session_id.clone()).await {
            Ok(value) => {
                let next = Snapshot::Present(value);
                tx.send_if_modified(|current| {
                    if *current == next {
                        false
                    } else {
                        *current = next;
                        true
                    }
                });
            }
            Err(e) if e.is_not_found() => {
                info!("Watched session no longer exists");
                tx.send_replace(Snapshot::Absent);
                return;
            }
            Err(e) => {
                warn!(error = %e, "Fetch failed, retrying on next wake");
            }
        }

        loop {
            match waker.wait().await {
                Some(wake) if wake.concerns(session_id) => break,
                Some(_) => continue,
                None => return,
            }
        }
    }
}
