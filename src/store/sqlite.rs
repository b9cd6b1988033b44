//! SQLite-backed session store.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::store::models::{MoveRow, NewMoveRow, SessionRow, encode_players};
use crate::store::{
    AppendReceipt, SessionStore, StoreError, StoreErrorKind, StoreEvent, check_terminal_write,
    schema,
};
use crate::{
    MAX_GUESSES, Move, PlayerId, Session, SessionId, SessionStatus, Word, assert_invariants,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Session store persisted to a SQLite file.
///
/// Opens a connection per operation and runs it on the blocking pool. Writes
/// use `BEGIN IMMEDIATE` so the append guard and the insert see the same
/// snapshot, even when several processes share the file.
///
/// Change events reach subscribers in this process only; other processes
/// observe writes by polling.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    /// Opens the database at `db_path`, creating it and applying pending
    /// migrations as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path.as_ref()))]
    pub fn open(db_path: impl AsRef<str>, event_capacity: usize) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_string();
        info!(path = %db_path, "Opening SQLite session store");

        let mut conn = Self::connect(&db_path)?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::unavailable(format!("Migrations failed: {}", e)))?;
        if !applied.is_empty() {
            info!(count = applied.len(), "Applied migrations");
        }

        let (events, _) = broadcast::channel(event_capacity.max(1));
        Ok(Self { db_path, events })
    }

    /// Path of the backing file.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    #[instrument]
    fn connect(db_path: &str) -> Result<SqliteConnection, StoreError> {
        debug!(path = %db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(db_path).map_err(|e| {
            StoreError::unavailable(format!("Failed to connect to '{}': {}", db_path, e))
        })?;
        diesel::sql_query(format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
            .execute(&mut conn)?;
        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;
        Ok(conn)
    }

    /// Runs `op` against a fresh connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = Self::connect(&db_path)?;
            op(&mut conn)
        })
        .await?
    }

    fn publish(&self, event: StoreEvent) {
        if self.events.send(event).is_err() {
            debug!("No subscribers for store event");
        }
    }
}

fn load_moves(conn: &mut SqliteConnection, id: &str) -> Result<Vec<MoveRow>, StoreError> {
    use schema::moves::dsl;

    Ok(dsl::moves
        .filter(dsl::session_id.eq(id))
        .order((dsl::played_at.asc(), dsl::id.asc()))
        .select(MoveRow::as_select())
        .load(conn)?)
}

fn hydrate(conn: &mut SqliteConnection, row: SessionRow) -> Result<Session, StoreError> {
    let moves = load_moves(conn, &row.id)?;
    row.into_session(moves)
}

fn load_session(conn: &mut SqliteConnection, id: &str) -> Result<Option<Session>, StoreError> {
    use schema::sessions::dsl;

    let row = dsl::sessions
        .filter(dsl::id.eq(id))
        .select(SessionRow::as_select())
        .first(conn)
        .optional()?;

    row.map(|row| hydrate(conn, row)).transpose()
}

fn find_active_row(conn: &mut SqliteConnection) -> Result<Option<SessionRow>, StoreError> {
    use schema::sessions::dsl;

    Ok(dsl::sessions
        .filter(dsl::status.eq(SessionStatus::InProgress.to_string()))
        .order((dsl::created_at.asc(), dsl::id.asc()))
        .select(SessionRow::as_select())
        .first(conn)
        .optional()?)
}

fn write_session_fields(conn: &mut SqliteConnection, session: &Session) -> Result<(), StoreError> {
    use schema::sessions::dsl;

    diesel::update(dsl::sessions.filter(dsl::id.eq(session.id().as_str())))
        .set((
            dsl::players.eq(encode_players(session.players())?),
            dsl::status.eq(session.status().to_string()),
            dsl::last_player_id.eq(session.last_player_id().as_deref()),
        ))
        .execute(conn)?;
    Ok(())
}

#[async_trait]
impl SessionStore for SqliteStore {
    #[instrument(skip(self, target), fields(creator = %creator))]
    async fn create_session(&self, target: Word, creator: PlayerId) -> Result<Session, StoreError> {
        let session = self
            .with_conn(move |conn| {
                conn.immediate_transaction(|conn| {
                    if let Some(active) = find_active_row(conn)? {
                        warn!(active_id = %active.id, "Refusing to create a second active session");
                        return Err(StoreError::new(StoreErrorKind::ActiveSessionExists {
                            id: active.id,
                        }));
                    }

                    let session =
                        Session::new(Uuid::new_v4().to_string(), target, creator, Utc::now());
                    diesel::insert_into(schema::sessions::table)
                        .values(&SessionRow::from_session(&session)?)
                        .execute(conn)?;
                    Ok(session)
                })
            })
            .await?;

        info!(session_id = %session.id(), "Session created");
        self.publish(StoreEvent::SessionCreated(session.id().clone()));
        Ok(session)
    }

    #[instrument(skip(self, guess), fields(session_id = %id, player_id = %player))]
    async fn append_move(
        &self,
        id: &SessionId,
        player: &PlayerId,
        guess: Word,
    ) -> Result<AppendReceipt, StoreError> {
        let session_id = id.clone();
        let player = player.clone();

        let receipt = self
            .with_conn(move |conn| {
                conn.immediate_transaction(|conn| {
                    let mut session = load_session(conn, &session_id)?
                        .ok_or_else(|| StoreError::not_found(&session_id))?;

                    if !session.is_in_progress() || session.moves().len() >= MAX_GUESSES {
                        warn!(
                            status = %session.status(),
                            moves = session.moves().len(),
                            "Append guard failed"
                        );
                        return Err(StoreError::new(StoreErrorKind::SessionNotActive {
                            id: session_id.clone(),
                        }));
                    }

                    let now = Utc::now();
                    let timestamp = session.last_move_at().map_or(now, |last| last.max(now));

                    diesel::insert_into(schema::moves::table)
                        .values(&NewMoveRow::new(
                            session_id.clone(),
                            player.clone(),
                            guess.to_string(),
                            timestamp.naive_utc(),
                        ))
                        .execute(conn)?;

                    let mv = Move::new(player.clone(), guess, timestamp);
                    session.add_player(&player);
                    session.push_move(mv.clone());
                    let move_number = session.moves().len();

                    let resolution = session.resolution();
                    if let Some(resolution) = &resolution {
                        session.finish(resolution.status, resolution.last_player.clone());
                    }
                    write_session_fields(conn, &session)?;
                    assert_invariants(&session);

                    Ok(AppendReceipt {
                        mv,
                        move_number,
                        resolution,
                    })
                })
            })
            .await?;

        info!(
            move_number = receipt.move_number,
            resolved = receipt.resolution.is_some(),
            "Move appended"
        );
        self.publish(StoreEvent::MoveAppended(id.clone()));
        if receipt.resolution.is_some() {
            self.publish(StoreEvent::SessionUpdated(id.clone()));
        }
        Ok(receipt)
    }

    #[instrument(skip(self), fields(session_id = %id, last_player = %last_player))]
    async fn set_terminal(
        &self,
        id: &SessionId,
        won: bool,
        last_player: &PlayerId,
    ) -> Result<Session, StoreError> {
        let session_id = id.clone();
        let last_player = last_player.clone();

        let (session, changed) = self
            .with_conn(move |conn| {
                conn.immediate_transaction(|conn| {
                    let mut session = load_session(conn, &session_id)?
                        .ok_or_else(|| StoreError::not_found(&session_id))?;

                    if !check_terminal_write(&session, won, &last_player)? {
                        return Ok((session, false));
                    }

                    session.finish(SessionStatus::terminal(won), last_player);
                    write_session_fields(conn, &session)?;
                    assert_invariants(&session);
                    Ok((session, true))
                })
            })
            .await?;

        if changed {
            info!(status = %session.status(), "Session ended");
            self.publish(StoreEvent::SessionUpdated(id.clone()));
        } else {
            debug!("Terminal state already recorded");
        }
        Ok(session)
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn get_session(&self, id: &SessionId) -> Result<Session, StoreError> {
        let session_id = id.clone();
        self.with_conn(move |conn| {
            load_session(conn, &session_id)?.ok_or_else(|| StoreError::not_found(&session_id))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn find_active(&self) -> Result<Option<Session>, StoreError> {
        self.with_conn(|conn| {
            find_active_row(conn)?
                .map(|row| hydrate(conn, row))
                .transpose()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn latest_session(&self) -> Result<Option<Session>, StoreError> {
        self.with_conn(|conn| {
            use schema::sessions::dsl;

            dsl::sessions
                .order((dsl::created_at.desc(), dsl::id.desc()))
                .select(SessionRow::as_select())
                .first(conn)
                .optional()?
                .map(|row| hydrate(conn, row))
                .transpose()
        })
        .await
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn list_moves(&self, id: &SessionId) -> Result<Vec<Move>, StoreError> {
        let session_id = id.clone();
        self.with_conn(move |conn| {
            load_session(conn, &session_id)?
                .map(|session| session.moves().clone())
                .ok_or_else(|| StoreError::not_found(&session_id))
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
