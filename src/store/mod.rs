//! Durable, authoritative session storage.
//!
//! The store is the single source of truth shared by every participant.
//! Concurrency is resolved here and only here: [`SessionStore::append_move`]
//! checks its guard and writes inside one transaction, so racing submitters
//! are serialized without any client-side locking.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{Move, PlayerId, Resolution, Session, SessionId, Word};

mod error;
mod memory;
mod models;
mod schema;
mod sqlite;

pub use error::{StoreError, StoreErrorKind};
pub use memory::{DEFAULT_EVENT_CAPACITY, MemoryStore};
pub use sqlite::SqliteStore;

/// Change notification published after every committed write.
///
/// Events carry only the session id; observers re-read the full snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A session was created.
    SessionCreated(SessionId),
    /// Session fields (status, roster, last player) changed.
    SessionUpdated(SessionId),
    /// A move was appended to the log.
    MoveAppended(SessionId),
}

impl StoreEvent {
    /// The session this event concerns.
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::SessionCreated(id) | Self::SessionUpdated(id) | Self::MoveAppended(id) => id,
        }
    }
}

/// Result of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReceipt {
    /// The stored move, with its assigned timestamp.
    pub mv: Move,
    /// 1-based position of the move in the log.
    pub move_number: usize,
    /// Set when this move ended the game; the terminal status was written
    /// in the same transaction.
    pub resolution: Option<Resolution>,
}

/// Authoritative session storage.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Creates a new in-progress session.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreErrorKind::ActiveSessionExists`] if another session
    /// is still in progress.
    async fn create_session(&self, target: Word, creator: PlayerId) -> Result<Session, StoreError>;

    /// Appends a move if, at commit time, the session is in progress and has
    /// fewer than six moves.
    ///
    /// Adds the player to the roster if needed. When the move wins or is the
    /// sixth, the terminal status and last player are written in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreErrorKind::SessionNotActive`] if the guard fails;
    /// callers should resynchronize rather than retry.
    async fn append_move(
        &self,
        id: &SessionId,
        player: &PlayerId,
        guess: Word,
    ) -> Result<AppendReceipt, StoreError>;

    /// Writes the terminal status and last player.
    ///
    /// Repeating the exact write already recorded is a no-op. On an
    /// in-progress session only `won = false` (abandonment) is accepted.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreErrorKind::AlreadyTerminal`] for a conflicting write
    /// to an ended session, or [`StoreErrorKind::InvalidTerminal`] for a win
    /// the move log does not support.
    async fn set_terminal(
        &self,
        id: &SessionId,
        won: bool,
        last_player: &PlayerId,
    ) -> Result<Session, StoreError>;

    /// Loads a session with its move log.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreErrorKind::NotFound`] if it does not exist.
    async fn get_session(&self, id: &SessionId) -> Result<Session, StoreError>;

    /// The oldest in-progress session, if any.
    async fn find_active(&self) -> Result<Option<Session>, StoreError>;

    /// The most recently created session, if any.
    async fn latest_session(&self) -> Result<Option<Session>, StoreError>;

    /// Move log ordered by timestamp ascending.
    async fn list_moves(&self, id: &SessionId) -> Result<Vec<Move>, StoreError>;

    /// Subscribes to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// Decides the outcome of a terminal write against the current record.
///
/// Returns `Ok(true)` if the write must be applied, `Ok(false)` if it is an
/// exact repeat of what is stored.
pub(crate) fn check_terminal_write(
    session: &Session,
    won: bool,
    last_player: &PlayerId,
) -> Result<bool, StoreError> {
    let status = crate::SessionStatus::terminal(won);
    let id = session.id().clone();

    if session.status().is_terminal() {
        let same = *session.status() == status
            && session.last_player_id().as_ref() == Some(last_player);
        return if same {
            Ok(false)
        } else {
            Err(StoreError::new(StoreErrorKind::AlreadyTerminal { id }))
        };
    }

    if won {
        return Err(StoreError::new(StoreErrorKind::InvalidTerminal {
            id,
            reason: "no winning move in the log".to_string(),
        }));
    }

    Ok(true)
}
