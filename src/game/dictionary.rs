//! Word list lookup.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::{ConfigError, ValidationError, Word};

const EMBEDDED_WORDS: &str = include_str!("../../data/words.txt");

/// Membership check over a fixed word list.
///
/// Implementations are loaded once and never change afterwards.
pub trait Dictionary: Send + Sync + std::fmt::Debug {
    /// Returns true if the word is in the list.
    fn contains(&self, word: &Word) -> bool;

    /// Runs the full local validation of raw input: shape, then membership.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for malformed input or unknown words.
    fn validate(&self, input: &str) -> Result<Word, ValidationError> {
        let word = Word::parse(input)?;
        if self.contains(&word) {
            Ok(word)
        } else {
            Err(ValidationError::NotInDictionary {
                word: word.to_string(),
            })
        }
    }
}

/// In-memory word list.
#[derive(Debug, Clone)]
pub struct WordList {
    words: HashSet<Word>,
}

impl WordList {
    /// Builds a list from any iterator of strings.
    ///
    /// Entries that are not five-letter words are skipped.
    #[instrument(skip(words))]
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: HashSet<Word> = words
            .into_iter()
            .filter_map(|w| Word::parse(w.as_ref()).ok())
            .collect();
        debug!(count = words.len(), "Word list built");
        Self { words }
    }

    /// Parses a newline-separated list.
    #[instrument(skip(text))]
    pub fn parse(text: &str) -> Self {
        let mut skipped = 0usize;
        let words: HashSet<Word> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match Word::parse(line) {
                Ok(word) => Some(word),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            warn!(skipped, "Skipped word list entries that are not five letters");
        }
        Self { words }
    }

    /// Loads a newline-separated list from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or yields no words.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!(
                "Failed to read word list {}: {}",
                path.display(),
                e
            ))
        })?;

        let list = Self::parse(&text);
        if list.is_empty() {
            return Err(ConfigError::new(format!(
                "Word list {} contains no five-letter words",
                path.display()
            )));
        }

        info!(count = list.len(), "Word list loaded");
        Ok(list)
    }

    /// The word list compiled into the binary.
    #[instrument]
    pub fn embedded() -> Self {
        Self::parse(EMBEDDED_WORDS)
    }

    /// Number of words in the list.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True if the list has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for WordList {
    fn default() -> Self {
        Self::embedded()
    }
}

impl Dictionary for WordList {
    fn contains(&self, word: &Word) -> bool {
        self.words.contains(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_listed_word_any_case() {
        let list = WordList::from_words(["crane", "sheep"]);
        let word = list.validate(" SHEEP").expect("listed");
        assert_eq!(word.as_str(), "sheep");
    }

    #[test]
    fn test_validate_rejects_unlisted_word() {
        let list = WordList::from_words(["crane"]);
        assert_eq!(
            list.validate("zzzzz"),
            Err(ValidationError::NotInDictionary {
                word: "zzzzz".to_string()
            })
        );
    }

    #[test]
    fn test_validate_reports_shape_errors_first() {
        let list = WordList::from_words(["crane"]);
        assert_eq!(list.validate(""), Err(ValidationError::Empty));
    }

    #[test]
    fn test_parse_skips_bad_lines() {
        let list = WordList::parse("crane\n\n  Sheep \ntoolong\nab\n");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_embedded_list_has_common_words() {
        let list = WordList::embedded();
        assert!(!list.is_empty());
        assert!(list.contains(&Word::parse("crane").expect("valid")));
        assert!(list.contains(&Word::parse("cabin").expect("valid")));
    }

    #[test]
    fn test_from_file_missing_is_error() {
        assert!(WordList::from_file("/definitely/not/here.txt").is_err());
    }
}
