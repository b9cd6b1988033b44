//! Session and move records.
//!
//! These are the persisted shapes shared by every store and delivered to
//! observers as full snapshots. Field names serialize in camelCase to match
//! the stored document layout.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::game::rules::{self, Resolution};
use crate::game::word::Word;

/// Opaque session identifier.
pub type SessionId = String;

/// Opaque player identifier supplied by the identity provider.
pub type PlayerId = String;

/// Lifecycle status of a session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting moves.
    InProgress,
    /// The target word was guessed.
    Completed,
    /// Guesses ran out, or the session was abandoned.
    Failed,
}

impl SessionStatus {
    /// True for `completed` and `failed`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Terminal status for a win flag.
    pub fn terminal(won: bool) -> Self {
        if won { Self::Completed } else { Self::Failed }
    }
}

/// One submitted guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    /// Who submitted the guess.
    player_id: PlayerId,
    /// The normalized guess.
    guess: Word,
    /// Store-assigned time; the only ordering key for replay.
    timestamp: DateTime<Utc>,
}

/// Authoritative record of one game.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Immutable identifier.
    id: SessionId,
    /// Hidden word; set once at creation.
    target_word: Word,
    /// Participants in order of first appearance; creator first.
    players: Vec<PlayerId>,
    /// Current status.
    status: SessionStatus,
    /// Creation time.
    created_at: DateTime<Utc>,
    /// Move log in append order.
    moves: Vec<Move>,
    /// Player whose move (or abandonment) ended the game.
    last_player_id: Option<PlayerId>,
}

impl Session {
    /// Creates a fresh in-progress session with the creator as sole player.
    pub fn new(
        id: SessionId,
        target_word: Word,
        creator: PlayerId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            target_word,
            players: vec![creator],
            status: SessionStatus::InProgress,
            created_at,
            moves: Vec::new(),
            last_player_id: None,
        }
    }

    /// Reassembles a session from stored parts.
    pub(crate) fn from_parts(
        id: SessionId,
        target_word: Word,
        players: Vec<PlayerId>,
        status: SessionStatus,
        created_at: DateTime<Utc>,
        moves: Vec<Move>,
        last_player_id: Option<PlayerId>,
    ) -> Self {
        Self {
            id,
            target_word,
            players,
            status,
            created_at,
            moves,
            last_player_id,
        }
    }

    /// True while moves are accepted.
    pub fn is_in_progress(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    /// The player who created the session.
    pub fn creator(&self) -> Option<&PlayerId> {
        self.players.first()
    }

    /// Timestamp of the latest move, if any.
    pub fn last_move_at(&self) -> Option<DateTime<Utc>> {
        self.moves.last().map(|m| *m.timestamp())
    }

    /// The target word, but only once the session is terminal.
    pub fn revealed_word(&self) -> Option<&Word> {
        self.status.is_terminal().then_some(&self.target_word)
    }

    /// Outcome implied by the move log alone.
    pub fn resolution(&self) -> Option<Resolution> {
        rules::resolve(&self.target_word, &self.moves)
    }

    /// Adds a player to the roster if not already present.
    pub(crate) fn add_player(&mut self, player: &PlayerId) {
        if !self.players.contains(player) {
            self.players.push(player.clone());
        }
    }

    /// Appends a move to the log.
    pub(crate) fn push_move(&mut self, mv: Move) {
        self.moves.push(mv);
    }

    /// Replaces the move log wholesale.
    pub(crate) fn set_moves(&mut self, moves: Vec<Move>) {
        self.moves = moves;
    }

    /// Records the terminal transition.
    pub(crate) fn finish(&mut self, status: SessionStatus, last_player: PlayerId) {
        self.status = status;
        self.last_player_id = Some(last_player);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let word: &dyn std::fmt::Debug = match self.revealed_word() {
            Some(word) => word,
            None => &"*****",
        };
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("target_word", word)
            .field("players", &self.players)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("moves", &self.moves)
            .field("last_player_id", &self.last_player_id)
            .finish()
    }
}
