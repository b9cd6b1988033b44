//! Per-client game lifecycle.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

use crate::lifecycle::{
    ActiveGame, ControllerError, GameEvent, GameResult, GameView, LifecycleState, SubmitOutcome,
};
use crate::store::SessionStore;
use crate::sync::{Discovery, FeedUpdate, SessionFeed, SyncConfig};
use crate::{Dictionary, IdentityProvider, Notifier, PlayerId, Session, SessionId};

/// What woke [`GameController::next_update`].
enum Wakeup {
    Discovered(Option<Option<Session>>),
    Feed(Option<FeedUpdate>),
    Identity(bool),
}

/// Drives one client through `NoSession -> Active -> Ended`.
///
/// All mutation happens through `&mut self`, so a late store completion can
/// never interleave with a snapshot being applied. Subscriptions are owned
/// tasks that stop when their handle is dropped.
#[derive(Debug)]
pub struct GameController {
    store: Arc<dyn SessionStore>,
    dictionary: Arc<dyn Dictionary>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    sync: SyncConfig,
    state: LifecycleState,
    /// Player who ended the last game this client saw. Outlives resets;
    /// cleared only when a new session is adopted.
    new_game_holder: Option<PlayerId>,
    feed: Option<SessionFeed>,
    discovery: Option<Discovery>,
    identity_rx: watch::Receiver<Option<PlayerId>>,
    identity_open: bool,
    events: mpsc::UnboundedSender<GameEvent>,
}

impl GameController {
    /// Creates an idle controller and the receiving end of its event stream.
    ///
    /// Nothing is fetched until [`start`](Self::start).
    #[instrument(skip_all)]
    pub fn new(
        store: Arc<dyn SessionStore>,
        dictionary: Arc<dyn Dictionary>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        sync: SyncConfig,
    ) -> (Self, mpsc::UnboundedReceiver<GameEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let identity_rx = identity.changes();
        let controller = Self {
            store,
            dictionary,
            identity,
            notifier,
            sync,
            state: LifecycleState::NoSession,
            new_game_holder: None,
            feed: None,
            discovery: None,
            identity_rx,
            identity_open: true,
            events,
        };
        (controller, events_rx)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Snapshot for the UI shell.
    pub fn view(&self) -> GameView {
        GameView::build(
            &self.state,
            self.new_game_holder.as_ref(),
            self.identity.current().as_ref(),
        )
    }

    /// Begins discovery and picks up where the shared store left off: adopts
    /// the in-progress session, or rebuilds the last game's result so the
    /// new-game permission survives a restart.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the initial queries fail;
    /// discovery keeps running regardless.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), ControllerError> {
        info!("Starting game controller");
        self.restart_discovery();
        self.reconcile().await
    }

    /// Creates a session with `word` as the target and starts tracking it.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::SignedOut`] with no player.
    /// - [`ControllerError::Validation`] for a bad word.
    /// - [`ControllerError::NotPermitted`] if another player ended the last
    ///   game and has not started the next.
    /// - [`ControllerError::Store`] if creation fails, including when another
    ///   session is already in progress. Discovery re-adopts it.
    #[instrument(skip(self, word))]
    pub async fn create(&mut self, word: &str) -> Result<SessionId, ControllerError> {
        let player = self.require_player()?;
        let word = self.dictionary.validate(word)?;

        if let Some(holder) = &self.new_game_holder
            && holder != &player
        {
            return Err(ControllerError::NotPermitted {
                holder: holder.clone(),
            });
        }

        self.force_reset();
        let session = self.store.create_session(word, player).await?;
        let id = session.id().clone();
        self.adopt(session);
        Ok(id)
    }

    /// Submits a guess for the signed-in player.
    ///
    /// Losing the race for the last move is not an error: it returns
    /// [`SubmitOutcome::Rejected`] and re-reads the session.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::SignedOut`] with no player.
    /// - [`ControllerError::Validation`] for a bad word.
    /// - [`ControllerError::NoActiveSession`] unless an in-progress session
    ///   is tracked.
    /// - [`ControllerError::Store`] for transient store failures.
    #[instrument(skip(self, guess))]
    pub async fn submit_guess(&mut self, guess: &str) -> Result<SubmitOutcome, ControllerError> {
        let player = self.require_player()?;
        let word = self.dictionary.validate(guess)?;

        let session = match &self.state {
            LifecycleState::Active(game) if game.session().is_in_progress() => {
                game.session().clone()
            }
            _ => return Err(ControllerError::NoActiveSession),
        };
        let id = session.id().clone();

        let appended = self.store.append_move(&id, &player, word).await;
        let receipt = match appended {
            Ok(receipt) => receipt,
            Err(e) if e.is_session_not_active() => {
                warn!(session_id = %id, "Move rejected, game state changed");
                self.emit(GameEvent::MoveRejected { session_id: id });
                self.resync_tracked().await;
                return Ok(SubmitOutcome::Rejected);
            }
            Err(e) if e.is_not_found() => {
                self.drop_removed(&id);
                return Ok(SubmitOutcome::SessionGone);
            }
            Err(e) => {
                warn!(error = %e, "Move submission failed");
                return Err(e.into());
            }
        };

        info!(session_id = %id, move_number = receipt.move_number, "Move accepted");
        self.notify_others(&session, &player);
        self.emit(GameEvent::MoveAccepted {
            session_id: id.clone(),
            move_number: receipt.move_number,
        });

        let Some(resolution) = receipt.resolution else {
            return Ok(SubmitOutcome::Accepted {
                move_number: receipt.move_number,
            });
        };

        let confirmed = self
            .store
            .set_terminal(&id, resolution.won(), &resolution.last_player)
            .await;
        let ended = match confirmed {
            Ok(ended) => ended,
            Err(e) => {
                warn!(error = %e, "Terminal confirmation failed; status was written with the move");
                let fetched = self.store.get_session(&id).await;
                fetched.unwrap_or_else(|e| {
                    warn!(error = %e, "Falling back to the local move log");
                    let mut ended = session;
                    ended.add_player(&player);
                    ended.push_move(receipt.mv);
                    ended.finish(resolution.status, resolution.last_player.clone());
                    ended
                })
            }
        };

        let result = GameResult::of(&ended, Some(&player));
        self.finish(result.clone());

        Ok(if resolution.won() {
            SubmitOutcome::Won(result)
        } else {
            SubmitOutcome::Exhausted(result)
        })
    }

    /// Ends `session_id` with the signed-in player as last player, tears
    /// down its subscriptions, and keeps discovering.
    ///
    /// Repeating the end of an already-ended session with the same outcome
    /// is harmless.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::SessionChanged`] if `session_id` is not tracked.
    /// - [`ControllerError::Store`] if the terminal write is refused.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn end(
        &mut self,
        session_id: &SessionId,
        won: bool,
    ) -> Result<GameResult, ControllerError> {
        let player = self.require_player()?;
        if self.state.session_id() != Some(session_id) {
            return Err(ControllerError::SessionChanged {
                session_id: session_id.clone(),
            });
        }

        let ended = self.store.set_terminal(session_id, won, &player).await;
        let session = match ended {
            Ok(session) => session,
            Err(e) => {
                if e.is_not_found() {
                    self.drop_removed(session_id);
                }
                return Err(e.into());
            }
        };

        let result = GameResult::of(&session, Some(&player));
        self.finish(result.clone());
        Ok(result)
    }

    /// Gives up on the tracked in-progress session; it ends as `failed`.
    ///
    /// # Errors
    ///
    /// [`ControllerError::NoActiveSession`] if nothing is in progress, or
    /// whatever [`end`](Self::end) returns.
    #[instrument(skip(self))]
    pub async fn abandon(&mut self) -> Result<GameResult, ControllerError> {
        let id = match &self.state {
            LifecycleState::Active(game) if game.session().is_in_progress() => {
                game.session().id().clone()
            }
            _ => return Err(ControllerError::NoActiveSession),
        };
        self.end(&id, false).await
    }

    /// Clears local state and restarts discovery. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub fn force_reset(&mut self) {
        self.clear_local();
        self.restart_discovery();
    }

    /// One-shot resynchronization after the process was suspended.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] if the store cannot be queried.
    #[instrument(skip(self))]
    pub async fn resume(&mut self) -> Result<(), ControllerError> {
        if self.feed.is_some() {
            self.resync_tracked().await;
            Ok(())
        } else {
            self.reconcile().await
        }
    }

    /// Waits for the next discovery, session, move-log, or identity change
    /// and applies it.
    ///
    /// Returns `false` once there is nothing left to wait on.
    pub async fn next_update(&mut self) -> bool {
        if self.discovery.is_none() && self.feed.is_none() && !self.identity_open {
            return false;
        }

        let wakeup = tokio::select! {
            found = next_discovery(&mut self.discovery) => Wakeup::Discovered(found),
            update = next_feed(&mut self.feed) => Wakeup::Feed(update),
            changed = self.identity_rx.changed(), if self.identity_open => {
                Wakeup::Identity(changed.is_ok())
            }
        };

        match wakeup {
            Wakeup::Discovered(Some(found)) => self.on_discovered(found).await,
            Wakeup::Discovered(None) => {
                warn!("Discovery stopped");
                self.discovery = None;
            }
            Wakeup::Feed(Some(update)) => self.on_feed(update),
            Wakeup::Feed(None) => {
                debug!("Session feed stopped");
                self.feed = None;
            }
            Wakeup::Identity(true) => self.on_identity().await,
            Wakeup::Identity(false) => self.identity_open = false,
        }
        true
    }

    fn require_player(&self) -> Result<PlayerId, ControllerError> {
        self.identity.current().ok_or(ControllerError::SignedOut)
    }

    fn emit(&self, event: GameEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }

    fn clear_local(&mut self) {
        self.feed = None;
        if !matches!(self.state, LifecycleState::NoSession) {
            info!("Resetting local game state");
            self.state = LifecycleState::NoSession;
            self.emit(GameEvent::Reset);
        }
    }

    fn restart_discovery(&mut self) {
        self.discovery = None;
        self.discovery = Some(Discovery::spawn(self.store.clone(), &self.sync));
    }

    /// Adopts the in-progress session, or rebuilds the last result.
    async fn reconcile(&mut self) -> Result<(), ControllerError> {
        if let Some(session) = self.store.find_active().await? {
            self.adopt(session);
            return Ok(());
        }

        if matches!(self.state, LifecycleState::NoSession)
            && let Some(latest) = self.store.latest_session().await?
            && latest.status().is_terminal()
        {
            debug!(session_id = %latest.id(), "Restoring last game result");
            let result = GameResult::of(&latest, self.identity.current().as_ref());
            self.new_game_holder = result.last_player().clone();
            self.state = LifecycleState::Ended(result.clone());
            self.emit(GameEvent::GameEnded(result));
        }
        Ok(())
    }

    fn adopt(&mut self, session: Session) {
        if self.state.session_id() == Some(session.id())
            && matches!(self.state, LifecycleState::Active(_))
        {
            return;
        }

        if session.status().is_terminal() {
            self.finish(GameResult::of(&session, self.identity.current().as_ref()));
            return;
        }

        let id = session.id().clone();
        info!(session_id = %id, players = session.players().len(), "Adopting session");
        self.new_game_holder = None;
        self.feed = Some(SessionFeed::spawn(self.store.clone(), id.clone(), &self.sync));
        self.state = LifecycleState::Active(ActiveGame::new(session));
        self.emit(GameEvent::SessionAdopted { session_id: id });
    }

    /// Enters `Ended`; discovery keeps running so the next game is found.
    fn finish(&mut self, result: GameResult) {
        if self.state == LifecycleState::Ended(result.clone()) {
            return;
        }
        info!(
            session_id = %result.session_id(),
            status = %result.status(),
            may_start_new_game = result.may_start_new_game(),
            "Game ended"
        );
        self.feed = None;
        self.new_game_holder = result.last_player().clone();
        self.state = LifecycleState::Ended(result.clone());
        self.emit(GameEvent::GameEnded(result));
    }

    fn drop_removed(&mut self, id: &SessionId) {
        if self.state.session_id() != Some(id) {
            return;
        }
        warn!(session_id = %id, "Tracked session no longer exists");
        self.feed = None;
        self.state = LifecycleState::NoSession;
        self.emit(GameEvent::SessionRemoved {
            session_id: id.clone(),
        });
    }

    async fn resync_tracked(&mut self) {
        let Some(feed) = &self.feed else {
            return;
        };
        let id = feed.session_id().clone();
        let fetched = feed.resync().await;
        match fetched {
            Ok(session) => self.apply_session(session),
            Err(e) if e.is_not_found() => self.drop_removed(&id),
            Err(e) => warn!(error = %e, "Resync failed"),
        }
    }

    fn apply_session(&mut self, session: Session) {
        if self.state.session_id() != Some(session.id()) {
            debug!(session_id = %session.id(), "Ignoring snapshot for untracked session");
            return;
        }

        if session.status().is_terminal() {
            self.finish(GameResult::of(&session, self.identity.current().as_ref()));
            return;
        }

        if let LifecycleState::Active(game) = &mut self.state {
            let event = GameEvent::SessionUpdated {
                session_id: session.id().clone(),
                players: session.players().len(),
            };
            game.replace_session(session);
            self.emit(event);
        }
    }

    fn on_feed(&mut self, update: FeedUpdate) {
        match update {
            FeedUpdate::Session(session) => self.apply_session(session),
            FeedUpdate::Moves(moves) => {
                if let LifecycleState::Active(game) = &mut self.state {
                    game.replace_moves(moves);
                    let event = GameEvent::BoardUpdated {
                        session_id: game.session().id().clone(),
                        filled_rows: game.board().filled_rows(),
                    };
                    debug!(filled_rows = game.board().filled_rows(), "Board rebuilt");
                    self.emit(event);
                }
            }
            FeedUpdate::Removed => {
                if let Some(id) = self.state.session_id().cloned() {
                    self.drop_removed(&id);
                }
            }
        }
    }

    async fn on_discovered(&mut self, found: Option<Session>) {
        match found {
            Some(session) => self.adopt(session),
            None => {
                let LifecycleState::Active(game) = &self.state else {
                    return;
                };
                let id = game.session().id().clone();
                let fetched = self.store.get_session(&id).await;
                match fetched {
                    Ok(session) if session.status().is_terminal() => {
                        self.finish(GameResult::of(&session, self.identity.current().as_ref()));
                    }
                    Ok(_) => debug!(session_id = %id, "Tracked session still in progress"),
                    Err(e) if e.is_not_found() => self.drop_removed(&id),
                    Err(e) => warn!(error = %e, "Failed to check tracked session"),
                }
            }
        }
    }

    async fn on_identity(&mut self) {
        let player = self.identity_rx.borrow_and_update().clone();
        match player {
            None => {
                info!("Player signed out");
                self.clear_local();
                self.discovery = None;
                self.emit(GameEvent::SignedOut);
            }
            Some(player_id) => {
                info!(player_id = %player_id, "Player signed in");
                if let LifecycleState::Ended(result) = &mut self.state {
                    result.set_viewer(Some(&player_id));
                }
                self.emit(GameEvent::SignedIn { player_id });
                if self.discovery.is_none() {
                    self.restart_discovery();
                }
                if let Err(e) = self.reconcile().await {
                    warn!(error = %e, "Failed to reconcile after sign-in");
                }
            }
        }
    }

    fn notify_others(&self, session: &Session, player: &PlayerId) {
        let recipients: Vec<PlayerId> = session
            .players()
            .iter()
            .filter(|p| *p != player)
            .cloned()
            .collect();
        if !recipients.is_empty() {
            self.notifier.notify(&recipients, session.id());
        }
    }
}

async fn next_discovery(discovery: &mut Option<Discovery>) -> Option<Option<Session>> {
    match discovery {
        Some(discovery) => discovery.next().await,
        None => std::future::pending().await,
    }
}

async fn next_feed(feed: &mut Option<SessionFeed>) -> Option<FeedUpdate> {
    match feed {
        Some(feed) => feed.next().await,
        None => std::future::pending().await,
    }
}
