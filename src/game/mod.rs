//! Game domain: words, feedback, sessions and the derived board.

mod board;
mod dictionary;
mod feedback;
mod invariants;
mod keyboard;
mod rules;
mod session;
mod word;

pub use board::{Board, Tile};
pub use dictionary::{Dictionary, WordList};
pub use feedback::{Feedback, TileState, classify};
pub use invariants::{
    Invariant, InvariantSet, InvariantViolation, MoveBoundInvariant, OrderedMovesInvariant,
    RosterInvariant, SessionInvariants, TerminalConsistentInvariant, assert_invariants,
};
pub use keyboard::KeyboardState;
pub use rules::{MAX_GUESSES, Resolution, resolve};
pub use session::{Move, PlayerId, Session, SessionId, SessionStatus};
pub use word::{ValidationError, WORD_LENGTH, Word};
