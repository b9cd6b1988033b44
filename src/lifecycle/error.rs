//! Controller error types.

use derive_more::{Display, Error, From};

use crate::{PlayerId, SessionId, StoreError, ValidationError};

/// Why a controller action was refused or failed.
#[derive(Debug, Clone, Display, Error, From)]
pub enum ControllerError {
    /// Input rejected locally; nothing was sent to the store.
    #[display("Invalid word: {}", _0)]
    #[from]
    Validation(#[error(source)] ValidationError),

    /// The store failed. Not retried; the user may re-trigger the action.
    #[display("{}", _0)]
    #[from]
    Store(#[error(source)] StoreError),

    /// No player is signed in.
    #[display("No player is signed in")]
    SignedOut,

    /// The action needs an in-progress session and none is tracked.
    #[display("No game in progress")]
    NoActiveSession,

    /// Another participant holds the right to start the next game.
    #[display("Waiting for {} to start the next game", holder)]
    NotPermitted {
        /// The player who ended the last game.
        holder: PlayerId,
    },

    /// The tracked session is not the one the action named.
    #[display("Session {} is no longer the tracked game", session_id)]
    SessionChanged {
        /// The session the caller asked about.
        session_id: SessionId,
    },
}
