//! In-process session store.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::store::{
    AppendReceipt, SessionStore, StoreError, StoreErrorKind, StoreEvent, check_terminal_write,
};
use crate::{
    MAX_GUESSES, Move, PlayerId, Session, SessionId, SessionStatus, Word, assert_invariants,
};

/// Default capacity of the change-event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Mutex-guarded store for tests and single-process embedding.
///
/// Every operation holds the lock for its whole read-check-write sequence,
/// which gives the same guard semantics as a database transaction.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    sessions: Arc<Mutex<Vec<Session>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates an empty store with the given change-event capacity.
    #[instrument]
    pub fn with_capacity(event_capacity: usize) -> Self {
        info!(event_capacity, "Creating in-memory session store");
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            sessions: Arc::new(Mutex::new(Vec::new())),
            events,
        }
    }

    /// Removes a session entirely, as if deleted by an administrator.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the session does not exist.
    #[instrument(skip(self))]
    pub fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        let mut sessions = self.lock()?;
        let index = sessions
            .iter()
            .position(|s| s.id() == id)
            .ok_or_else(|| StoreError::not_found(id))?;
        sessions.remove(index);
        drop(sessions);

        info!(session_id = %id, "Session deleted");
        self.publish(StoreEvent::SessionUpdated(id.clone()));
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Session>>, StoreError> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::unavailable("session store lock poisoned"))
    }

    fn publish(&self, event: StoreEvent) {
        if self.events.send(event).is_err() {
            debug!("No subscribers for store event");
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    #[instrument(skip(self, target), fields(creator = %creator))]
    async fn create_session(&self, target: Word, creator: PlayerId) -> Result<Session, StoreError> {
        let mut sessions = self.lock()?;

        if let Some(active) = sessions.iter().find(|s| s.is_in_progress()) {
            warn!(active_id = %active.id(), "Refusing to create a second active session");
            return Err(StoreError::new(StoreErrorKind::ActiveSessionExists {
                id: active.id().clone(),
            }));
        }

        let session = Session::new(Uuid::new_v4().to_string(), target, creator, Utc::now());
        sessions.push(session.clone());
        drop(sessions);

        info!(session_id = %session.id(), "Session created");
        self.publish(StoreEvent::SessionCreated(session.id().clone()));
        Ok(session)
    }

    #[instrument(skip(self, guess), fields(session_id = %id, player_id = %player))]
    async fn append_move(
        &self,
        id: &SessionId,
        player: &PlayerId,
        guess: Word,
    ) -> Result<AppendReceipt, StoreError> {
        let mut sessions = self.lock()?;
        let session = sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| StoreError::not_found(id))?;

        if !session.is_in_progress() || session.moves().len() >= MAX_GUESSES {
            warn!(status = %session.status(), moves = session.moves().len(), "Append guard failed");
            return Err(StoreError::new(StoreErrorKind::SessionNotActive { id: id.clone() }));
        }

        let now = Utc::now();
        let timestamp = session.last_move_at().map_or(now, |last| last.max(now));
        let mv = Move::new(player.clone(), guess, timestamp);

        session.add_player(player);
        session.push_move(mv.clone());
        let move_number = session.moves().len();

        let resolution = session.resolution();
        if let Some(resolution) = &resolution {
            session.finish(resolution.status, resolution.last_player.clone());
        }
        assert_invariants(session);
        drop(sessions);

        info!(move_number, resolved = resolution.is_some(), "Move appended");
        self.publish(StoreEvent::MoveAppended(id.clone()));
        if resolution.is_some() {
            self.publish(StoreEvent::SessionUpdated(id.clone()));
        }

        Ok(AppendReceipt {
            mv,
            move_number,
            resolution,
        })
    }

    #[instrument(skip(self), fields(session_id = %id, last_player = %last_player))]
    async fn set_terminal(
        &self,
        id: &SessionId,
        won: bool,
        last_player: &PlayerId,
    ) -> Result<Session, StoreError> {
        let mut sessions = self.lock()?;
        let session = sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| StoreError::not_found(id))?;

        if !check_terminal_write(session, won, last_player)? {
            debug!("Terminal state already recorded");
            return Ok(session.clone());
        }

        session.finish(SessionStatus::terminal(won), last_player.clone());
        assert_invariants(session);
        let updated = session.clone();
        drop(sessions);

        info!(status = %updated.status(), "Session ended");
        self.publish(StoreEvent::SessionUpdated(id.clone()));
        Ok(updated)
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn get_session(&self, id: &SessionId) -> Result<Session, StoreError> {
        self.lock()?
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    #[instrument(skip(self))]
    async fn find_active(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.lock()?.iter().find(|s| s.is_in_progress()).cloned())
    }

    #[instrument(skip(self))]
    async fn latest_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.lock()?.last().cloned())
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn list_moves(&self, id: &SessionId) -> Result<Vec<Move>, StoreError> {
        self.lock()?
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.moves().clone())
            .ok_or_else(|| StoreError::not_found(id))
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Word {
        Word::parse(s).expect("valid test word")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::new();
        let created = store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        let loaded = store.get_session(created.id()).await.expect("get");
        assert_eq!(created, loaded);
        assert_eq!(loaded.status(), &SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn test_second_active_session_refused() {
        let store = MemoryStore::new();
        store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        let err = store
            .create_session(word("sheep"), "bob".to_string())
            .await
            .expect_err("second active session");
        assert!(matches!(err.kind(), StoreErrorKind::ActiveSessionExists { .. }));
    }

    #[tokio::test]
    async fn test_append_grows_roster_and_orders_timestamps() {
        let store = MemoryStore::new();
        let s = store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        store
            .append_move(s.id(), &"bob".to_string(), word("cabin"))
            .await
            .expect("append");
        let receipt = store
            .append_move(s.id(), &"alice".to_string(), word("sheep"))
            .await
            .expect("append");
        assert_eq!(receipt.move_number, 2);
        assert!(receipt.resolution.is_none());

        let loaded = store.get_session(s.id()).await.expect("get");
        assert_eq!(loaded.players(), &vec!["alice".to_string(), "bob".to_string()]);
        let moves = store.list_moves(s.id()).await.expect("moves");
        assert!(moves[0].timestamp() <= moves[1].timestamp());
    }

    #[tokio::test]
    async fn test_winning_append_ends_session_atomically() {
        let store = MemoryStore::new();
        let s = store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        let receipt = store
            .append_move(s.id(), &"bob".to_string(), word("crane"))
            .await
            .expect("append");
        let resolution = receipt.resolution.expect("resolved");
        assert!(resolution.won());

        let loaded = store.get_session(s.id()).await.expect("get");
        assert_eq!(loaded.status(), &SessionStatus::Completed);
        assert_eq!(loaded.last_player_id().as_deref(), Some("bob"));

        let err = store
            .append_move(s.id(), &"alice".to_string(), word("cabin"))
            .await
            .expect_err("session ended");
        assert!(err.is_session_not_active());
    }

    #[tokio::test]
    async fn test_set_terminal_repeat_is_noop_and_conflict_fails() {
        let store = MemoryStore::new();
        let s = store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        store
            .append_move(s.id(), &"bob".to_string(), word("crane"))
            .await
            .expect("append");

        let same = store
            .set_terminal(s.id(), true, &"bob".to_string())
            .await
            .expect("identical write");
        assert_eq!(same.status(), &SessionStatus::Completed);

        let err = store
            .set_terminal(s.id(), false, &"alice".to_string())
            .await
            .expect_err("conflicting write");
        assert!(matches!(err.kind(), StoreErrorKind::AlreadyTerminal { .. }));
    }

    #[tokio::test]
    async fn test_set_terminal_rejects_unsupported_win() {
        let store = MemoryStore::new();
        let s = store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        let err = store
            .set_terminal(s.id(), true, &"alice".to_string())
            .await
            .expect_err("no winning move");
        assert!(matches!(err.kind(), StoreErrorKind::InvalidTerminal { .. }));

        let abandoned = store
            .set_terminal(s.id(), false, &"alice".to_string())
            .await
            .expect("abandon");
        assert_eq!(abandoned.status(), &SessionStatus::Failed);
    }

    #[tokio::test]
    async fn test_events_published() {
        let store = MemoryStore::new();
        let mut events = store.subscribe();
        let s = store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        store
            .append_move(s.id(), &"alice".to_string(), word("crane"))
            .await
            .expect("append");

        assert_eq!(
            events.recv().await.expect("event"),
            StoreEvent::SessionCreated(s.id().clone())
        );
        assert_eq!(
            events.recv().await.expect("event"),
            StoreEvent::MoveAppended(s.id().clone())
        );
        assert_eq!(
            events.recv().await.expect("event"),
            StoreEvent::SessionUpdated(s.id().clone())
        );
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let store = MemoryStore::new();
        let s = store
            .create_session(word("crane"), "alice".to_string())
            .await
            .expect("create");
        store.delete_session(s.id()).expect("delete");
        let err = store.get_session(s.id()).await.expect_err("gone");
        assert!(err.is_not_found());
        assert!(store.find_active().await.expect("query").is_none());
    }
}
