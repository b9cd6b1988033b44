//! Per-letter feedback for a guess against the target word.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::game::word::{WORD_LENGTH, Word};

/// Classification of one guessed letter.
///
/// Variants are ordered by strength, so `Correct > Present > Absent`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TileState {
    /// Letter does not occur in the remaining target letters.
    Absent,
    /// Letter occurs in the target at a different position.
    Present,
    /// Letter is in the right position.
    Correct,
}

/// Feedback for a full guess, one state per position.
pub type Feedback = [TileState; WORD_LENGTH];

/// Classifies each letter of `guess` against `target`.
///
/// Exact matches are resolved first and removed from the pool of target
/// letters. Remaining positions then consume one pool occurrence each when
/// their letter is present, so a guess can never earn more `Present` marks
/// for a letter than the target has unmatched copies of it.
#[instrument(level = "trace", skip_all)]
pub fn classify(guess: &Word, target: &Word) -> Feedback {
    let guess = guess.letters();
    let target = target.letters();

    let mut states = [TileState::Absent; WORD_LENGTH];
    let mut pool: [Option<u8>; WORD_LENGTH] = target.map(Some);

    for i in 0..WORD_LENGTH {
        if guess[i] == target[i] {
            states[i] = TileState::Correct;
            pool[i] = None;
        }
    }

    for i in 0..WORD_LENGTH {
        if states[i] == TileState::Correct {
            continue;
        }
        if let Some(slot) = pool.iter_mut().find(|slot| **slot == Some(guess[i])) {
            states[i] = TileState::Present;
            *slot = None;
        }
    }

    states
}
