//! Five-letter word newtype and local input validation.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Number of letters in every target word and guess.
pub const WORD_LENGTH: usize = 5;

/// A validated, lowercase, five-letter ASCII word.
///
/// Construction always goes through [`Word::parse`], so holding a `Word`
/// means the shape checks already passed. Dictionary membership is a
/// separate check (see [`crate::Dictionary::validate`]).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Word(String);

impl Word {
    /// Parses raw user input into a word.
    ///
    /// Surrounding whitespace is trimmed and letters are lowercased.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the input is empty, not exactly
    /// [`WORD_LENGTH`] characters, or contains non-alphabetic characters.
    #[instrument(level = "trace")]
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }

        let length = trimmed.chars().count();
        if length != WORD_LENGTH {
            return Err(ValidationError::WrongLength { length });
        }

        if !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::NonAlphabetic);
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Returns the word as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the letters as fixed-size byte array.
    pub fn letters(&self) -> [u8; WORD_LENGTH] {
        let mut out = [0u8; WORD_LENGTH];
        out.copy_from_slice(self.0.as_bytes());
        out
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Word({:?})", self.0)
    }
}

impl std::str::FromStr for Word {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Word {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Word> for String {
    fn from(word: Word) -> Self {
        word.0
    }
}

/// Reasons a word is rejected before it reaches the session store.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ValidationError {
    /// Input was empty or whitespace only.
    #[display("Word cannot be empty")]
    Empty,

    /// Input had the wrong number of letters.
    #[display("Word must be {} letters, got {}", WORD_LENGTH, length)]
    WrongLength {
        /// Number of characters supplied.
        length: usize,
    },

    /// Input contained something other than ASCII letters.
    #[display("Word must contain only letters")]
    NonAlphabetic,

    /// Input is well-formed but not in the word list.
    #[display("'{}' is not in the word list", word)]
    NotInDictionary {
        /// The rejected word.
        word: String,
    },
}

impl std::error::Error for ValidationError {}
