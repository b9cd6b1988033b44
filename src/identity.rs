//! Player identity.
//!
//! The core only needs "who is playing right now, if anyone" and a way to
//! hear about sign-in and sign-out.

use tokio::sync::watch;
use tracing::{info, instrument};

use crate::PlayerId;

/// Source of the current player identifier.
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// The signed-in player, or `None`.
    fn current(&self) -> Option<PlayerId>;

    /// Stream of identity changes; the current value is marked seen.
    fn changes(&self) -> watch::Receiver<Option<PlayerId>>;
}

/// Identity held in process, switched explicitly.
#[derive(Debug)]
pub struct LocalIdentity {
    tx: watch::Sender<Option<PlayerId>>,
}

impl LocalIdentity {
    /// Starts signed out.
    pub fn signed_out() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Starts signed in as `player`.
    pub fn signed_in(player: impl Into<PlayerId>) -> Self {
        let (tx, _) = watch::channel(Some(player.into()));
        Self { tx }
    }

    /// Signs in, replacing any current player.
    #[instrument(skip(self, player))]
    pub fn sign_in(&self, player: impl Into<PlayerId>) {
        let player = player.into();
        info!(player_id = %player, "Signed in");
        self.tx.send_replace(Some(player));
    }

    /// Signs out. A no-op when already signed out.
    #[instrument(skip(self))]
    pub fn sign_out(&self) {
        let was_signed_in = self.tx.send_if_modified(|current| current.take().is_some());
        if was_signed_in {
            info!("Signed out");
        }
    }
}

impl IdentityProvider for LocalIdentity {
    fn current(&self) -> Option<PlayerId> {
        self.tx.borrow().clone()
    }

    fn changes(&self) -> watch::Receiver<Option<PlayerId>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_and_out_are_observed() {
        let identity = LocalIdentity::signed_out();
        let mut changes = identity.changes();
        assert_eq!(identity.current(), None);

        identity.sign_in("alice");
        changes.changed().await.expect("sender alive");
        assert_eq!(changes.borrow_and_update().as_deref(), Some("alice"));

        identity.sign_out();
        changes.changed().await.expect("sender alive");
        assert_eq!(*changes.borrow_and_update(), None);
    }

    #[test]
    fn test_repeated_sign_out_is_harmless() {
        let identity = LocalIdentity::signed_in("bob");
        let changes = identity.changes();
        identity.sign_out();
        identity.sign_out();
        assert!(changes.has_changed().expect("sender alive"));
        assert_eq!(identity.current(), None);
    }
}
