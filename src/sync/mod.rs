//! Realtime delivery of store state to observers.
//!
//! Every watcher here follows the same loop: fetch the full current record,
//! publish it on a `watch` channel if it differs from the last one, then
//! sleep until something suggests it may have changed. Wakes come from the
//! store's change events and, for stores shared across processes, a poll
//! tick. Observers always receive whole snapshots, never diffs.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::store::{SessionStore, StoreEvent};

mod discovery;
mod feed;

pub use discovery::Discovery;
pub use feed::{FeedUpdate, SessionFeed};

/// Default poll period for cross-process stores.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Wake-up policy for watcher tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Re-fetch period in addition to change events; `None` relies on
    /// events alone.
    pub poll_interval: Option<Duration>,
}

impl SyncConfig {
    /// Event-driven only; suitable for a store owned by this process.
    pub fn events_only() -> Self {
        Self {
            poll_interval: None,
        }
    }

    /// Events plus a poll tick every `interval`.
    pub fn polling(interval: Duration) -> Self {
        Self {
            poll_interval: Some(interval),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::polling(DEFAULT_POLL_INTERVAL)
    }
}

/// Latest known state of a watched record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Snapshot<T> {
    /// Nothing fetched yet.
    #[default]
    Pending,
    /// The record as last read.
    Present(T),
    /// The record does not exist.
    Absent,
}

impl<T> Snapshot<T> {
    /// Converts to `Some(Some(_))` / `Some(None)`; `None` while pending.
    pub fn into_fetched(self) -> Option<Option<T>> {
        match self {
            Self::Pending => None,
            Self::Present(value) => Some(Some(value)),
            Self::Absent => Some(None),
        }
    }
}

/// Why a watcher should re-fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Wake {
    /// A committed write.
    Event(StoreEvent),
    /// Events were dropped; state is unknown.
    Lagged,
    /// Poll period elapsed.
    Tick,
}

impl Wake {
    /// True if this wake could concern `session_id`.
    pub(crate) fn concerns(&self, session_id: &str) -> bool {
        match self {
            Self::Event(event) => event.session_id() == session_id,
            Self::Lagged | Self::Tick => true,
        }
    }
}

/// Combined change-event and poll-tick source for one watcher task.
#[derive(Debug)]
pub(crate) struct Waker {
    events: Option<broadcast::Receiver<StoreEvent>>,
    ticker: Option<Interval>,
}

impl Waker {
    pub(crate) fn new(store: &dyn SessionStore, config: &SyncConfig) -> Self {
        let ticker = config.poll_interval.filter(|p| !p.is_zero()).map(|period| {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        Self {
            events: Some(store.subscribe()),
            ticker,
        }
    }

    /// Waits for the next reason to re-fetch.
    ///
    /// Returns `None` once the event channel is closed and there is no
    /// poll tick to fall back on.
    pub(crate) async fn wait(&mut self) -> Option<Wake> {
        loop {
            tokio::select! {
                event = recv_event(&mut self.events), if self.events.is_some() => {
                    match event {
                        Ok(event) => return Some(Wake::Event(event)),
                        Err(RecvError::Lagged(n)) => {
                            warn!(skipped = n, "Watcher lagged behind store events");
                            return Some(Wake::Lagged);
                        }
                        Err(RecvError::Closed) => {
                            info!("Store event channel closed");
                            self.events = None;
                        }
                    }
                }

                _ = tick(&mut self.ticker), if self.ticker.is_some() => {
                    debug!("Poll tick");
                    return Some(Wake::Tick);
                }

                else => return None,
            }
        }
    }
}

async fn recv_event(
    events: &mut Option<broadcast::Receiver<StoreEvent>>,
) -> Result<StoreEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, Word};

    #[tokio::test]
    async fn test_waker_reports_events() {
        let store = MemoryStore::new();
        let mut waker = Waker::new(&store, &SyncConfig::events_only());
        let session = store
            .create_session(Word::parse("crane").expect("valid"), "alice".to_string())
            .await
            .expect("create");

        let wake = waker.wait().await.expect("wake");
        assert_eq!(wake, Wake::Event(StoreEvent::SessionCreated(session.id().clone())));
        assert!(wake.concerns(session.id()));
        assert!(!wake.concerns("other"));
    }

    #[tokio::test]
    async fn test_waker_ticks_when_polling() {
        let store = MemoryStore::new();
        let mut waker = Waker::new(&store, &SyncConfig::polling(Duration::from_millis(10)));
        assert_eq!(waker.wait().await, Some(Wake::Tick));
    }

    #[tokio::test]
    async fn test_waker_reports_lag() {
        let store = MemoryStore::with_capacity(1);
        let mut waker = Waker::new(&store, &SyncConfig::events_only());
        for word in ["crane", "sheep"] {
            let session = store
                .create_session(Word::parse(word).expect("valid"), "alice".to_string())
                .await
                .expect("create");
            store
                .set_terminal(session.id(), false, &"alice".to_string())
                .await
                .expect("abandon");
        }
        assert_eq!(waker.wait().await, Some(Wake::Lagged));
    }

    #[test]
    fn test_snapshot_into_fetched() {
        assert_eq!(Snapshot::<u8>::Pending.into_fetched(), None);
        assert_eq!(Snapshot::Present(1).into_fetched(), Some(Some(1)));
        assert_eq!(Snapshot::<u8>::Absent.into_fetched(), Some(None));
    }
}
