//! Fire-and-forget change notifications to other participants.

use tracing::{info, instrument};

use crate::{PlayerId, SessionId};

/// Tells players that a session changed. Failures are the implementation's
/// problem; callers never wait on or inspect the result.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Notifies `recipients` that `session_id` changed.
    fn notify(&self, recipients: &[PlayerId], session_id: &SessionId);
}

/// Records notifications in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    #[instrument(skip(self, recipients), fields(count = recipients.len()))]
    fn notify(&self, recipients: &[PlayerId], session_id: &SessionId) {
        for recipient in recipients {
            info!(recipient = %recipient, session_id = %session_id, "Session changed");
        }
    }
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _recipients: &[PlayerId], _session_id: &SessionId) {}
}
