//! Terminal consistency: status agrees with the move log.

use super::Invariant;
use crate::game::session::Session;

/// Invariant: status and `lastPlayerId` agree with the move log.
///
/// - a log that resolves the game forces that exact terminal status, and
///   the deciding move must be the last one
/// - an in-progress session has no `lastPlayerId`
/// - a terminal session always has one
///
/// A terminal session whose log does not resolve is allowed; that is an
/// abandoned game.
pub struct TerminalConsistentInvariant;

impl Invariant<Session> for TerminalConsistentInvariant {
    fn holds(session: &Session) -> bool {
        if session.status().is_terminal() != session.last_player_id().is_some() {
            return false;
        }
        match session.resolution() {
            Some(resolution) => {
                resolution.status == *session.status()
                    && resolution.move_number == session.moves().len()
                    && session.last_player_id().as_ref() == Some(&resolution.last_player)
            }
            None => true,
        }
    }

    fn description() -> &'static str {
        "Status and last player agree with the move log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::{Move, SessionStatus};
    use crate::game::word::Word;
    use chrono::Utc;

    fn session() -> Session {
        Session::new(
            "s".to_string(),
            Word::parse("crane").expect("valid"),
            "a".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_abandoned_session_holds() {
        let mut s = session();
        s.finish(SessionStatus::Failed, "a".to_string());
        assert!(TerminalConsistentInvariant::holds(&s));
    }

    #[test]
    fn test_unrecorded_win_violates() {
        let mut s = session();
        s.push_move(Move::new(
            "a".to_string(),
            Word::parse("crane").expect("valid"),
            Utc::now(),
        ));
        assert!(!TerminalConsistentInvariant::holds(&s));
    }

    #[test]
    fn test_move_after_win_violates() {
        let mut s = session();
        let now = Utc::now();
        s.push_move(Move::new("a".to_string(), Word::parse("crane").expect("valid"), now));
        s.push_move(Move::new("a".to_string(), Word::parse("cabin").expect("valid"), now));
        s.finish(SessionStatus::Completed, "a".to_string());
        assert!(!TerminalConsistentInvariant::holds(&s));
    }

    #[test]
    fn test_terminal_without_last_player_violates() {
        let mut s = session();
        s.finish(SessionStatus::Failed, "a".to_string());
        assert!(TerminalConsistentInvariant::holds(&s));
        let json = serde_json::to_value(&s).expect("serializable");
        let mut json = json;
        json["lastPlayerId"] = serde_json::Value::Null;
        let broken: Session = serde_json::from_value(json).expect("deserializable");
        assert!(!TerminalConsistentInvariant::holds(&broken));
    }
}
