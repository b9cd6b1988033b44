//! Ordered moves invariant: timestamps never go backwards.

use super::Invariant;
use crate::game::session::Session;

/// Invariant: move timestamps are non-decreasing in log order.
pub struct OrderedMovesInvariant;

impl Invariant<Session> for OrderedMovesInvariant {
    fn holds(session: &Session) -> bool {
        session
            .moves()
            .windows(2)
            .all(|pair| pair[0].timestamp() <= pair[1].timestamp())
    }

    fn description() -> &'static str {
        "Move timestamps are non-decreasing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::Move;
    use crate::game::word::Word;
    use chrono::{Duration, Utc};

    #[test]
    fn test_out_of_order_violates() {
        let now = Utc::now();
        let mut s = Session::new(
            "s".to_string(),
            Word::parse("crane").expect("valid"),
            "a".to_string(),
            now,
        );
        let guess = Word::parse("cabin").expect("valid");
        s.push_move(Move::new("a".to_string(), guess.clone(), now));
        assert!(OrderedMovesInvariant::holds(&s));

        s.push_move(Move::new("a".to_string(), guess, now - Duration::seconds(1)));
        assert!(!OrderedMovesInvariant::holds(&s));
    }
}
