//! Move bound invariant: a session never holds more than six moves.

use super::Invariant;
use crate::game::rules::MAX_GUESSES;
use crate::game::session::Session;

/// Invariant: `moves.len() <= 6`.
pub struct MoveBoundInvariant;

impl Invariant<Session> for MoveBoundInvariant {
    fn holds(session: &Session) -> bool {
        session.moves().len() <= MAX_GUESSES
    }

    fn description() -> &'static str {
        "Session holds at most six moves"
    }
}
