//! Roster invariant: every mover is a listed player.

use super::Invariant;
use crate::game::session::Session;

/// Invariant: the roster is non-empty and contains every player with a move.
pub struct RosterInvariant;

impl Invariant<Session> for RosterInvariant {
    fn holds(session: &Session) -> bool {
        !session.players().is_empty()
            && session
                .moves()
                .iter()
                .all(|mv| session.players().contains(mv.player_id()))
    }

    fn description() -> &'static str {
        "Roster lists the creator and every player who moved"
    }
}
