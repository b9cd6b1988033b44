//! Shwordle: a two-player Wordle variant played over one shared session.
//!
//! Players take turns guessing a hidden five-letter word. Every participant
//! observes the same authoritative session, and every client rebuilds its
//! board from the move log on each update.
//!
//! # Architecture
//!
//! - **Game**: words, the feedback engine, sessions, rules, and the board
//!   replayed from a move log
//! - **Store**: durable session storage with a transactional move append
//!   (SQLite or in memory)
//! - **Sync**: standing subscriptions delivering full snapshots to observers
//! - **Lifecycle**: the per-client controller that discovers, creates,
//!   plays, and ends sessions
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shwordle::{
//!     GameController, LocalIdentity, MemoryStore, NoopNotifier, SyncConfig, WordList,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let (mut controller, _events) = GameController::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(WordList::embedded()),
//!     Arc::new(LocalIdentity::signed_in("alice")),
//!     Arc::new(NoopNotifier),
//!     SyncConfig::events_only(),
//! );
//! controller.start().await?;
//! controller.create("crane").await?;
//! let outcome = controller.submit_guess("cabin").await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod game;
mod identity;
mod lifecycle;
mod notify;
mod store;
mod sync;

// Crate-level exports - Configuration
pub use config::{ConfigError, ShwordleConfig};

// Crate-level exports - Game domain
pub use game::{
    Board, Dictionary, Feedback, Invariant, InvariantSet, InvariantViolation, KeyboardState,
    MAX_GUESSES, Move, MoveBoundInvariant, OrderedMovesInvariant, PlayerId, Resolution,
    RosterInvariant, Session, SessionId, SessionInvariants, SessionStatus,
    TerminalConsistentInvariant, Tile, TileState, ValidationError, WORD_LENGTH, Word, WordList,
    assert_invariants, classify, resolve,
};

// Crate-level exports - Collaborator seams
pub use identity::{IdentityProvider, LocalIdentity};
pub use notify::{NoopNotifier, Notifier, TracingNotifier};

// Crate-level exports - Storage
pub use store::{
    AppendReceipt, DEFAULT_EVENT_CAPACITY, MemoryStore, SessionStore, SqliteStore, StoreError,
    StoreErrorKind, StoreEvent,
};

// Crate-level exports - Sync
pub use sync::{DEFAULT_POLL_INTERVAL, Discovery, FeedUpdate, SessionFeed, Snapshot, SyncConfig};

// Crate-level exports - Lifecycle
pub use lifecycle::{
    ActiveGame, ControllerError, GameController, GameEvent, GameResult, GameView, LifecycleState,
    Phase, SubmitOutcome,
};
