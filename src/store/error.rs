//! Session store error types.

use derive_more::{Display, Error};
use tracing::instrument;

use crate::SessionId;

/// What went wrong in a store operation.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum StoreErrorKind {
    /// The append guard failed: the session is no longer accepting moves.
    #[display("Session {} is not accepting moves", id)]
    SessionNotActive {
        /// Session the move targeted.
        id: SessionId,
    },

    /// No session with this id.
    #[display("Session {} not found", id)]
    NotFound {
        /// Requested id.
        id: SessionId,
    },

    /// A conflicting terminal write for a session that already ended.
    #[display("Session {} already ended", id)]
    AlreadyTerminal {
        /// Session id.
        id: SessionId,
    },

    /// Another session is still in progress.
    #[display("Session {} is already in progress", id)]
    ActiveSessionExists {
        /// The in-progress session.
        id: SessionId,
    },

    /// A terminal write that contradicts the move log.
    #[display("Invalid terminal write for session {}: {}", id, reason)]
    InvalidTerminal {
        /// Session id.
        id: SessionId,
        /// Why it was refused.
        reason: String,
    },

    /// Transient I/O or connection failure.
    #[display("Store unavailable: {}", reason)]
    Unavailable {
        /// Underlying failure.
        reason: String,
    },

    /// Stored data could not be decoded.
    #[display("Corrupt record: {}", reason)]
    Corrupt {
        /// What failed to decode.
        reason: String,
    },
}

/// Store error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}:{}", kind, file, line)]
pub struct StoreError {
    /// Error kind.
    pub kind: StoreErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error with caller location tracking.
    #[track_caller]
    #[instrument(skip(kind))]
    pub fn new(kind: StoreErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for [`StoreErrorKind::Unavailable`].
    #[track_caller]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable {
            reason: reason.into(),
        })
    }

    /// Shorthand for [`StoreErrorKind::Corrupt`].
    #[track_caller]
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Corrupt {
            reason: reason.into(),
        })
    }

    /// Shorthand for [`StoreErrorKind::NotFound`].
    #[track_caller]
    pub fn not_found(id: &SessionId) -> Self {
        Self::new(StoreErrorKind::NotFound { id: id.clone() })
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &StoreErrorKind {
        &self.kind
    }

    /// True if the append guard rejected the move.
    pub fn is_session_not_active(&self) -> bool {
        matches!(self.kind, StoreErrorKind::SessionNotActive { .. })
    }

    /// True if the session does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StoreErrorKind::NotFound { .. })
    }

    /// True for transient failures the user may retry.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.kind, StoreErrorKind::Unavailable { .. })
    }
}

impl From<diesel::result::Error> for StoreError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::unavailable(format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for StoreError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::unavailable(format!("Connection error: {}", err))
    }
}

impl From<tokio::task::JoinError> for StoreError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> Self {
        Self::unavailable(format!("Store task failed: {}", err))
    }
}
