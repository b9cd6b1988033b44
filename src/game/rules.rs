//! Terminal-state rules.

use tracing::instrument;

use crate::game::session::{Move, PlayerId, SessionStatus};
use crate::game::word::Word;

/// Maximum number of guesses in a session.
pub const MAX_GUESSES: usize = 6;

/// How a move log ends a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// `Completed` or `Failed`.
    pub status: SessionStatus,
    /// Player whose move ended the game.
    pub last_player: PlayerId,
    /// 1-based index of the deciding move.
    pub move_number: usize,
}

impl Resolution {
    /// True if the word was guessed.
    pub fn won(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

/// Finds the first point at which the move log ends the game.
///
/// A correct guess ends it as `Completed` at that move, even before the
/// sixth. Otherwise the sixth move ends it as `Failed`.
#[instrument(level = "trace", skip_all, fields(moves = moves.len()))]
pub fn resolve(target: &Word, moves: &[Move]) -> Option<Resolution> {
    for (index, mv) in moves.iter().enumerate().take(MAX_GUESSES) {
        let move_number = index + 1;
        if mv.guess() == target {
            return Some(Resolution {
                status: SessionStatus::Completed,
                last_player: mv.player_id().clone(),
                move_number,
            });
        }
        if move_number == MAX_GUESSES {
            return Some(Resolution {
                status: SessionStatus::Failed,
                last_player: mv.player_id().clone(),
                move_number,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mv(player: &str, guess: &str) -> Move {
        Move::new(
            player.to_string(),
            Word::parse(guess).expect("valid"),
            Utc::now(),
        )
    }

    fn target() -> Word {
        Word::parse("crane").expect("valid")
    }

    #[test]
    fn test_empty_log_unresolved() {
        assert_eq!(resolve(&target(), &[]), None);
    }

    #[test]
    fn test_five_misses_unresolved() {
        let moves: Vec<Move> = (0..5).map(|_| mv("a", "cabin")).collect();
        assert_eq!(resolve(&target(), &moves), None);
    }

    #[test]
    fn test_sixth_miss_fails() {
        let mut moves: Vec<Move> = (0..5).map(|_| mv("a", "cabin")).collect();
        moves.push(mv("b", "sheep"));
        let resolution = resolve(&target(), &moves).expect("resolved");
        assert_eq!(resolution.status, SessionStatus::Failed);
        assert_eq!(resolution.last_player, "b");
        assert_eq!(resolution.move_number, 6);
        assert!(!resolution.won());
    }

    #[test]
    fn test_early_win_completes() {
        let moves = vec![mv("a", "cabin"), mv("b", "crane")];
        let resolution = resolve(&target(), &moves).expect("resolved");
        assert!(resolution.won());
        assert_eq!(resolution.last_player, "b");
        assert_eq!(resolution.move_number, 2);
    }

    #[test]
    fn test_win_on_sixth_move_is_completed() {
        let mut moves: Vec<Move> = (0..5).map(|_| mv("a", "cabin")).collect();
        moves.push(mv("a", "crane"));
        let resolution = resolve(&target(), &moves).expect("resolved");
        assert_eq!(resolution.status, SessionStatus::Completed);
    }
}
