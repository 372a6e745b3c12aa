//! A signed-in sync session for one CLI invocation.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use vitalog_core::{
    AuthSession, HttpRemoteStore, LocalStore, StoreState, SyncController, SyncHandle,
};

use crate::config::Config;

pub struct SyncSession {
    // Dropping the auth session stops the controller.
    _auth: AuthSession,
    store: LocalStore,
    handle: SyncHandle,
    timeout: Duration,
}

impl SyncSession {
    /// Resolves the configured API key, starts the sync controller and waits
    /// for the initial load. Must run inside a `LocalSet`.
    pub async fn connect(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let server_url = config
            .server_url
            .value
            .clone()
            .ok_or("Sync server not configured. Set server_url in the config file or VITALOG_SERVER_URL.")?;
        let api_key = config
            .api_key
            .value
            .clone()
            .ok_or("API key not configured. Set api_key in the config file or VITALOG_API_KEY.")?;
        let wait = config.sync_timeout();

        let auth = AuthSession::new();
        let remote = HttpRemoteStore::new(server_url, auth.clone());
        let principal = timeout(wait, remote.identity(&api_key))
            .await
            .map_err(|_| "Timed out contacting the sync server")??;
        tracing::debug!("Resolved API key to {}", principal.uid);

        let store = LocalStore::new();
        let handle = SyncController::start(store.clone(), Arc::new(remote), &auth);
        auth.sign_in(principal);

        timeout(wait, handle.ready())
            .await
            .map_err(|_| "Timed out loading data from the sync server")??;

        Ok(Self {
            _auth: auth,
            store,
            handle,
            timeout: wait,
        })
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn state(&self) -> Arc<StoreState> {
        self.store.snapshot()
    }

    pub fn handle(&self) -> &SyncHandle {
        &self.handle
    }

    /// Waits for local changes to reach the server, then stops syncing.
    pub async fn finish(self) -> Result<(), Box<dyn std::error::Error>> {
        let settled = timeout(self.timeout, self.handle.settled()).await;
        self.handle.shutdown();

        match settled {
            Ok(result) => Ok(result?),
            Err(_) => Err("Timed out waiting for changes to reach the sync server".into()),
        }
    }
}
