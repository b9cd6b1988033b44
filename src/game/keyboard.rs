//! Keyboard letter colouring aggregated across guesses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::feedback::{Feedback, TileState};
use crate::game::word::Word;

/// Strongest known state for each letter guessed so far.
///
/// A letter only ever moves up the `Absent < Present < Correct` order, so a
/// letter shown correct by an earlier guess is never downgraded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardState {
    letters: BTreeMap<char, TileState>,
}

impl KeyboardState {
    /// Creates an empty keyboard with no letters coloured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one classified guess into the aggregate.
    pub fn record(&mut self, guess: &Word, feedback: &Feedback) {
        for (letter, state) in guess.as_str().chars().zip(feedback.iter()) {
            self.letters
                .entry(letter)
                .and_modify(|known| *known = (*known).max(*state))
                .or_insert(*state);
        }
    }

    /// State of a letter, or `None` if it has not been guessed.
    pub fn get(&self, letter: char) -> Option<TileState> {
        self.letters.get(&letter.to_ascii_lowercase()).copied()
    }

    /// Iterates over coloured letters in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = (char, TileState)> + '_ {
        self.letters.iter().map(|(c, s)| (*c, *s))
    }

    /// Number of letters coloured so far.
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    /// True if nothing has been guessed yet.
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }
}
