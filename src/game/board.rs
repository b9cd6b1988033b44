//! Guess grid rebuilt from the move log.
//!
//! The board is never patched in place. Every move-log snapshot produces a
//! brand new board by replaying the log through [`classify`], which makes
//! the derived grid and keyboard a pure function of the target word and the
//! moves. Missed or reordered deliveries cannot leave it out of sync.

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::game::feedback::{TileState, classify};
use crate::game::keyboard::KeyboardState;
use crate::game::rules::MAX_GUESSES;
use crate::game::session::Move;
use crate::game::word::{WORD_LENGTH, Word};

/// One cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tile {
    /// Letter shown, if the row has been played.
    pub letter: Option<char>,
    /// Feedback for the letter; `None` for empty cells.
    pub state: Option<TileState>,
}

/// Fixed 6x5 guess grid plus keyboard colouring.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    rows: [[Tile; WORD_LENGTH]; MAX_GUESSES],
    filled_rows: usize,
    keyboard: KeyboardState,
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the board from scratch by replaying `moves` in log order.
    ///
    /// Moves past the sixth are ignored.
    #[instrument(level = "debug", skip_all, fields(moves = moves.len()))]
    pub fn replay(target: &Word, moves: &[Move]) -> Self {
        let mut board = Self::new();

        for (row, mv) in moves.iter().take(MAX_GUESSES).enumerate() {
            let feedback = classify(mv.guess(), target);
            for (col, (letter, state)) in mv.guess().as_str().chars().zip(feedback).enumerate() {
                board.rows[row][col] = Tile {
                    letter: Some(letter),
                    state: Some(state),
                };
            }
            board.keyboard.record(mv.guess(), &feedback);
            board.filled_rows = row + 1;
        }

        if moves.len() > MAX_GUESSES {
            trace!(ignored = moves.len() - MAX_GUESSES, "Move log longer than grid");
        }

        board
    }

    /// All rows, top to bottom.
    pub fn rows(&self) -> &[[Tile; WORD_LENGTH]; MAX_GUESSES] {
        &self.rows
    }

    /// Number of played rows; also the index of the next row to fill.
    pub fn filled_rows(&self) -> usize {
        self.filled_rows
    }

    /// True if all six rows are played.
    pub fn is_full(&self) -> bool {
        self.filled_rows == MAX_GUESSES
    }

    /// Aggregated keyboard colouring.
    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Plain-text rendering: `[C]` correct, `(A)` present, ` b ` absent.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for (i, row) in self.rows.iter().enumerate() {
            for tile in row {
                let cell = match (tile.letter, tile.state) {
                    (Some(c), Some(TileState::Correct)) => format!("[{}]", c.to_ascii_uppercase()),
                    (Some(c), Some(TileState::Present)) => format!("({})", c.to_ascii_uppercase()),
                    (Some(c), _) => format!(" {} ", c),
                    (None, _) => " _ ".to_string(),
                };
                out.push_str(&cell);
            }
            if i + 1 < MAX_GUESSES {
                out.push('\n');
            }
        }
        out
    }
}
