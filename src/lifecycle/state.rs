//! Controller state, results, and events.

use derive_getters::Getters;
use serde::Serialize;

use crate::{Board, PlayerId, Session, SessionId, SessionStatus, Word};

/// A session this client is playing, with its derived board.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ActiveGame {
    /// Latest snapshot of the session.
    session: Session,
    /// Grid and keyboard rebuilt from the latest move log.
    board: Board,
}

impl ActiveGame {
    pub(crate) fn new(session: Session) -> Self {
        let board = Board::replay(session.target_word(), session.moves());
        Self { session, board }
    }

    /// Replaces the session snapshot and rebuilds the board from its log.
    pub(crate) fn replace_session(&mut self, session: Session) {
        self.board = Board::replay(session.target_word(), session.moves());
        self.session = session;
    }

    /// Replaces the move log and rebuilds the board.
    pub(crate) fn replace_moves(&mut self, moves: Vec<crate::Move>) {
        self.board = Board::replay(self.session.target_word(), &moves);
        self.session.set_moves(moves);
    }
}

/// Outcome of a finished game as seen by one client.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
pub struct GameResult {
    /// The finished session.
    session_id: SessionId,
    /// The target word, revealed.
    word: Word,
    /// `completed` or `failed`.
    status: SessionStatus,
    /// Player whose move or abandonment ended the game.
    last_player: Option<PlayerId>,
    /// Final roster.
    players: Vec<PlayerId>,
    /// Final grid and keyboard, replayed from the full move log.
    board: Board,
    /// True if the viewing player may create the next session.
    may_start_new_game: bool,
}

impl GameResult {
    /// Builds the result of a terminal session for `viewer`.
    pub(crate) fn of(session: &Session, viewer: Option<&PlayerId>) -> Self {
        let last_player = session.last_player_id().clone();
        Self {
            session_id: session.id().clone(),
            word: session.target_word().clone(),
            status: *session.status(),
            may_start_new_game: gate_open(last_player.as_ref(), viewer),
            last_player,
            players: session.players().clone(),
            board: Board::replay(session.target_word(), session.moves()),
        }
    }

    /// True if the word was guessed.
    pub fn won(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Recomputes the new-game permission for a different viewer.
    pub(crate) fn set_viewer(&mut self, viewer: Option<&PlayerId>) {
        self.may_start_new_game = gate_open(self.last_player.as_ref(), viewer);
    }
}

pub(crate) fn gate_open(last_player: Option<&PlayerId>, viewer: Option<&PlayerId>) -> bool {
    match (last_player, viewer) {
        (Some(holder), Some(viewer)) => holder == viewer,
        (None, Some(_)) => true,
        (_, None) => false,
    }
}

/// Client-local lifecycle: `NoSession -> Active -> Ended -> ...`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Nothing tracked; waiting for discovery or a local create.
    #[default]
    NoSession,
    /// Playing a session.
    Active(ActiveGame),
    /// The tracked session finished; discovery keeps running.
    Ended(GameResult),
}

impl LifecycleState {
    /// Id of the tracked session, active or ended.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::NoSession => None,
            Self::Active(game) => Some(game.session().id()),
            Self::Ended(result) => Some(result.session_id()),
        }
    }

    /// Short name of the phase.
    pub fn phase(&self) -> Phase {
        match self {
            Self::NoSession => Phase::NoSession,
            Self::Active(_) => Phase::Active,
            Self::Ended(_) => Phase::Ended,
        }
    }
}

/// Lifecycle phase without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// No session tracked.
    NoSession,
    /// A session is being played.
    Active,
    /// The last session finished.
    Ended,
}

/// What the UI shell may show.
///
/// The target word is present only once the session is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
pub struct GameView {
    /// Current phase.
    phase: Phase,
    /// Tracked session, if any.
    session_id: Option<SessionId>,
    /// Status of the tracked session.
    status: Option<SessionStatus>,
    /// Roster of the tracked session.
    players: Vec<PlayerId>,
    /// Rebuilt grid and keyboard.
    board: Board,
    /// Revealed word; `None` while in progress.
    target_word: Option<Word>,
    /// Player who ended the last game.
    last_player: Option<PlayerId>,
    /// True if the viewer may create a session now.
    may_start_new_game: bool,
}

impl GameView {
    /// `holder` is the player who ended the last game seen by this client;
    /// it keeps gating creation after local state is reset.
    pub(crate) fn build(
        state: &LifecycleState,
        holder: Option<&PlayerId>,
        viewer: Option<&PlayerId>,
    ) -> Self {
        match state {
            LifecycleState::NoSession => Self {
                phase: Phase::NoSession,
                session_id: None,
                status: None,
                players: Vec::new(),
                board: Board::new(),
                target_word: None,
                last_player: holder.cloned(),
                may_start_new_game: gate_open(holder, viewer),
            },
            LifecycleState::Active(game) => {
                let session = game.session();
                Self {
                    phase: Phase::Active,
                    session_id: Some(session.id().clone()),
                    status: Some(*session.status()),
                    players: session.players().clone(),
                    board: game.board().clone(),
                    target_word: session.revealed_word().cloned(),
                    last_player: session.last_player_id().clone(),
                    may_start_new_game: false,
                }
            }
            LifecycleState::Ended(result) => Self {
                phase: Phase::Ended,
                session_id: Some(result.session_id().clone()),
                status: Some(*result.status()),
                players: result.players().clone(),
                board: result.board().clone(),
                target_word: Some(result.word().clone()),
                last_player: result.last_player().clone(),
                may_start_new_game: gate_open(result.last_player().as_ref(), viewer),
            },
        }
    }
}

/// Notifications from the controller to its UI shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Started tracking a session.
    SessionAdopted {
        /// The adopted session.
        session_id: SessionId,
    },
    /// A new session snapshot was applied.
    SessionUpdated {
        /// Session id.
        session_id: SessionId,
        /// Roster size.
        players: usize,
    },
    /// The board was rebuilt from a new move log.
    BoardUpdated {
        /// Session id.
        session_id: SessionId,
        /// Played rows.
        filled_rows: usize,
    },
    /// Our guess was stored.
    MoveAccepted {
        /// Session id.
        session_id: SessionId,
        /// 1-based move number.
        move_number: usize,
    },
    /// Our guess lost the race; the game state changed underneath it.
    MoveRejected {
        /// Session id.
        session_id: SessionId,
    },
    /// The tracked session reached a terminal status.
    GameEnded(GameResult),
    /// The tracked session disappeared from the store.
    SessionRemoved {
        /// Session id.
        session_id: SessionId,
    },
    /// Local state was cleared.
    Reset,
    /// A player signed in.
    SignedIn {
        /// New player.
        player_id: PlayerId,
    },
    /// The player signed out.
    SignedOut,
}

/// Result of a guess submission that reached the store, or was turned away
/// because the game changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Stored; the game continues.
    Accepted {
        /// 1-based move number.
        move_number: usize,
    },
    /// Stored, and it guessed the word.
    Won(GameResult),
    /// Stored as the sixth miss.
    Exhausted(GameResult),
    /// Refused because the session stopped accepting moves first.
    Rejected,
    /// The session no longer exists.
    SessionGone,
}
