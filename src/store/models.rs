//! Row types for the SQLite store.

use chrono::NaiveDateTime;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::store::{StoreError, schema};
use crate::{Move, PlayerId, Session, SessionStatus, Word};

/// One `sessions` row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct SessionRow {
    pub id: String,
    pub target_word: String,
    pub players: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub last_player_id: Option<String>,
}

impl SessionRow {
    /// Flattens a session for insertion. The move log is stored separately.
    #[instrument(skip(session), fields(session_id = %session.id()))]
    pub fn from_session(session: &Session) -> Result<Self, StoreError> {
        Ok(Self {
            id: session.id().clone(),
            target_word: session.target_word().to_string(),
            players: encode_players(session.players())?,
            status: session.status().to_string(),
            created_at: session.created_at().naive_utc(),
            last_player_id: session.last_player_id().clone(),
        })
    }

    /// Reassembles the domain session.
    ///
    /// # Errors
    ///
    /// Returns a corrupt-record [`StoreError`] if any column fails to decode.
    #[instrument(skip(self, moves), fields(session_id = %self.id, moves = moves.len()))]
    pub fn into_session(self, moves: Vec<MoveRow>) -> Result<Session, StoreError> {
        let target_word = Word::parse(&self.target_word).map_err(|e| {
            StoreError::corrupt(format!("session {} target word: {}", self.id, e))
        })?;
        let players: Vec<PlayerId> = serde_json::from_str(&self.players)
            .map_err(|e| StoreError::corrupt(format!("session {} players: {}", self.id, e)))?;
        let status: SessionStatus = self.status.parse().map_err(|_| {
            StoreError::corrupt(format!("session {} status '{}'", self.id, self.status))
        })?;
        let moves = moves
            .into_iter()
            .map(MoveRow::into_move)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Session::from_parts(
            self.id,
            target_word,
            players,
            status,
            self.created_at.and_utc(),
            moves,
            self.last_player_id,
        ))
    }
}

/// One `moves` row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::moves)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct MoveRow {
    pub id: i32,
    pub session_id: String,
    pub player_id: String,
    pub guess: String,
    pub played_at: NaiveDateTime,
}

impl MoveRow {
    /// Converts to a domain move.
    pub fn into_move(self) -> Result<Move, StoreError> {
        let guess = Word::parse(&self.guess)
            .map_err(|e| StoreError::corrupt(format!("move {} guess: {}", self.id, e)))?;
        Ok(Move::new(self.player_id, guess, self.played_at.and_utc()))
    }
}

/// Insertable move.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::moves)]
pub(crate) struct NewMoveRow {
    session_id: String,
    player_id: String,
    guess: String,
    played_at: NaiveDateTime,
}

/// Encodes the roster as a JSON array.
pub(crate) fn encode_players(players: &[PlayerId]) -> Result<String, StoreError> {
    serde_json::to_string(players).map_err(|e| StoreError::corrupt(format!("players: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_session_row_round_trip() {
        let session = Session::new(
            "s1".to_string(),
            Word::parse("crane").expect("valid"),
            "alice".to_string(),
            Utc::now(),
        );
        let row = SessionRow::from_session(&session).expect("encodable");
        assert_eq!(row.players, r#"["alice"]"#);
        assert_eq!(row.status, "in_progress");

        let back = row.into_session(Vec::new()).expect("decodable");
        assert_eq!(back, session);
    }

    #[test]
    fn test_corrupt_status_reported() {
        let row = SessionRow {
            id: "s1".to_string(),
            target_word: "crane".to_string(),
            players: "[]".to_string(),
            status: "paused".to_string(),
            created_at: Utc::now().naive_utc(),
            last_player_id: None,
        };
        let err = row.into_session(Vec::new()).expect_err("bad status");
        assert!(matches!(err.kind(), crate::StoreErrorKind::Corrupt { .. }));
    }

    #[test]
    fn test_corrupt_guess_reported() {
        let row = MoveRow {
            id: 7,
            session_id: "s1".to_string(),
            player_id: "bob".to_string(),
            guess: "toolong".to_string(),
            played_at: Utc::now().naive_utc(),
        };
        assert!(row.into_move().is_err());
    }
}
