use tokio::sync::{mpsc, oneshot, watch};

use super::controller::Command;
use super::error::SyncError;
use super::status::{SessionState, SyncStatus};
use crate::store::LocalStore;

/// Cloneable handle for talking to a running sync controller.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SyncStatus>,
    store: LocalStore,
}

impl SyncHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        status: watch::Receiver<SyncStatus>,
        store: LocalStore,
    ) -> Self {
        Self {
            commands,
            status,
            store,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    /// Waits until the session has been seeded from the remote store.
    pub async fn ready(&self) -> Result<(), SyncError> {
        let mut status = self.status.clone();
        loop {
            {
                let current = status.borrow_and_update();
                match &current.session {
                    SessionState::Active => return Ok(()),
                    SessionState::Failed(e) => return Err(SyncError::Session(e.clone())),
                    SessionState::SignedOut | SessionState::Loading => {}
                }
            }
            status.changed().await.map_err(|_| SyncError::Stopped)?;
        }
    }

    /// Waits until every local change made so far has reached the remote
    /// store, or a push has failed.
    pub async fn settled(&self) -> Result<(), SyncError> {
        let mut status = self.status.clone();
        loop {
            {
                let current = status.borrow_and_update();
                match &current.session {
                    SessionState::SignedOut => return Err(SyncError::NotSignedIn),
                    SessionState::Failed(e) => return Err(SyncError::Session(e.clone())),
                    SessionState::Loading => {}
                    SessionState::Active => {
                        // Results only count once the latest change has been seen.
                        let state = self.store.snapshot();
                        if current.has_observed(&state) {
                            if current.is_synced(&state) {
                                return Ok(());
                            }
                            if let Some(err) = current.push_failure() {
                                return Err(err);
                            }
                        }
                    }
                }
            }
            status.changed().await.map_err(|_| SyncError::Stopped)?;
        }
    }

    /// Deletes every remote document of the principal, then clears local state.
    pub async fn clear_all(&self) -> Result<(), SyncError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::ClearAll(reply_tx))
            .map_err(|_| SyncError::Stopped)?;
        reply_rx.await.map_err(|_| SyncError::Stopped)?
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}
