//! The sync controller.
//!
//! One task owns every piece of sync state. It reacts to principal changes,
//! local store transitions, remote snapshots and push completions, handling
//! each to completion before taking the next.

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use super::collection::{CollectionSync, PushFuture, PushOutcome};
use super::error::SyncError;
use super::handle::SyncHandle;
use super::status::{SessionState, SyncStatus};
use crate::auth::{AuthSession, Principal};
use crate::models::{Diet, FoodEntry};
use crate::remote::{RemoteStore, Subscription};
use crate::store::{AuthState, CollectionKind, Entity, LocalStore};

pub(crate) enum Command {
    ClearAll(oneshot::Sender<Result<(), SyncError>>),
    Shutdown,
}

pub struct SyncController<R> {
    store: LocalStore,
    remote: Arc<R>,
    auth: watch::Receiver<Option<Principal>>,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<SyncStatus>,
    principal: Option<Principal>,
    session: SessionState,
    diets: CollectionSync<Diet>,
    food_entries: CollectionSync<FoodEntry>,
    pushes: FuturesUnordered<PushFuture>,
}

impl<R: RemoteStore + 'static> SyncController<R> {
    pub fn new(store: LocalStore, remote: Arc<R>, auth: &AuthSession) -> (Self, SyncHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SyncStatus::default());

        let handle = SyncHandle::new(command_tx, status_rx, store.clone());
        let controller = Self {
            store,
            remote,
            auth: auth.on_auth_state_change(),
            commands: command_rx,
            status: status_tx,
            principal: None,
            session: SessionState::SignedOut,
            diets: CollectionSync::new(),
            food_entries: CollectionSync::new(),
            pushes: FuturesUnordered::new(),
        };
        (controller, handle)
    }

    /// Spawns the controller on the current `LocalSet`.
    ///
    /// Panics when called outside a `LocalSet`, like `tokio::task::spawn_local`.
    pub fn start(store: LocalStore, remote: Arc<R>, auth: &AuthSession) -> SyncHandle {
        let (controller, handle) = Self::new(store, remote, auth);
        tokio::task::spawn_local(controller.run());
        handle
    }

    pub async fn run(mut self) {
        let mut changes = self.store.subscribe();
        let initial = self.auth.borrow_and_update().clone();
        self.on_principal(initial).await;
        self.publish_status();

        loop {
            tokio::select! {
                changed = self.auth.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Auth session dropped, stopping sync");
                        break;
                    }
                    let principal = self.auth.borrow_and_update().clone();
                    self.on_principal(principal).await;
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.reconcile();
                }
                snapshot = next_snapshot(&mut self.diets.subscription) => match snapshot {
                    Some(items) => self.diets.receive(&self.store, items),
                    None => self.subscription_closed(CollectionKind::Diets),
                },
                snapshot = next_snapshot(&mut self.food_entries.subscription) => match snapshot {
                    Some(items) => self.food_entries.receive(&self.store, items),
                    None => self.subscription_closed(CollectionKind::FoodEntries),
                },
                Some(outcome) = self.pushes.next(), if !self.pushes.is_empty() => {
                    self.complete_push(outcome);
                }
                command = self.commands.recv() => match command {
                    Some(Command::ClearAll(reply)) => {
                        let result = self.clear_all().await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
            self.publish_status();
        }

        self.end_session();
        self.publish_status();
        tracing::debug!("Sync controller stopped");
    }

    async fn on_principal(&mut self, principal: Option<Principal>) {
        let failed = matches!(self.session, SessionState::Failed(_));
        if principal == self.principal && !failed {
            return;
        }

        if self.principal.is_some() {
            self.end_session();
        }
        self.principal = principal.clone();

        match principal {
            Some(principal) => self.start_session(principal).await,
            None => {
                tracing::info!("Signed out, local collections cleared");
                self.store.set_auth(AuthState::default());
            }
        }
    }

    async fn start_session(&mut self, principal: Principal) {
        tracing::info!("Starting sync session for {}", principal.uid);
        self.session = SessionState::Loading;
        self.store.set_auth(AuthState {
            principal: Some(principal.clone()),
            loading: true,
        });
        self.publish_status();

        let (diets, food_entries) = tokio::join!(
            self.remote.fetch_all::<Diet>(),
            self.remote.fetch_all::<FoodEntry>()
        );

        let loaded = match (diets, food_entries) {
            (Ok(diets), Ok(food_entries)) => {
                tracing::info!(
                    "Loaded {} diet(s) and {} food entry(ies)",
                    diets.len(),
                    food_entries.len()
                );
                self.diets.seed(&self.store, diets);
                self.food_entries.seed(&self.store, food_entries);
                true
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!("Failed to load data for {}: {}", principal.uid, e);
                self.session = SessionState::Failed(e.to_string());
                false
            }
        };

        self.store.set_auth(AuthState {
            principal: Some(principal),
            loading: false,
        });
        if !loaded {
            return;
        }

        self.diets.subscription = subscribe(&*self.remote);
        self.food_entries.subscription = subscribe(&*self.remote);
        self.session = SessionState::Active;
        self.reconcile();
    }

    fn end_session(&mut self) {
        // Listeners go first so no snapshot lands after the clear.
        self.diets.reset();
        self.food_entries.reset();
        self.pushes = FuturesUnordered::new();

        self.store.replace_collection::<Diet>(Vec::new());
        self.store.replace_collection::<FoodEntry>(Vec::new());
        self.session = SessionState::SignedOut;
    }

    fn reconcile(&mut self) {
        if self.session != SessionState::Active {
            return;
        }
        if let Some(push) = self.diets.reconcile(&self.store, &self.remote) {
            self.pushes.push(push);
        }
        if let Some(push) = self.food_entries.reconcile(&self.store, &self.remote) {
            self.pushes.push(push);
        }
    }

    fn complete_push(&mut self, outcome: PushOutcome) {
        let succeeded = outcome.result.is_ok();
        match outcome.kind {
            CollectionKind::Diets => self.diets.complete(outcome.result),
            CollectionKind::FoodEntries => self.food_entries.complete(outcome.result),
        }
        // A failure waits for the next local change before retrying.
        if succeeded {
            self.reconcile();
        }
    }

    fn subscription_closed(&mut self, kind: CollectionKind) {
        tracing::warn!("Remote subscription to {} ended", kind);
        match kind {
            CollectionKind::Diets => self.diets.unsubscribe(),
            CollectionKind::FoodEntries => self.food_entries.unsubscribe(),
        }
    }

    async fn clear_all(&mut self) -> Result<(), SyncError> {
        match &self.session {
            SessionState::Active => {}
            SessionState::Failed(e) => return Err(SyncError::Session(e.clone())),
            SessionState::SignedOut | SessionState::Loading => return Err(SyncError::NotSignedIn),
        }

        // A push landing after the wipe would bring documents back.
        self.pushes = FuturesUnordered::new();
        self.diets.abandon_push();
        self.food_entries.abandon_push();

        match self.remote.clear_all().await {
            Ok(()) => {
                tracing::info!("Cleared all remote data");
                self.diets.cleared(&self.store);
                self.food_entries.cleared(&self.store);
                self.reconcile();
                Ok(())
            }
            Err(e) => {
                // Local data stays; pushes resume with the next change.
                tracing::error!("Failed to clear remote data: {}", e);
                Err(SyncError::Remote(e))
            }
        }
    }

    fn publish_status(&self) {
        let next = SyncStatus {
            session: self.session.clone(),
            diets: self.diets.status(),
            food_entries: self.food_entries.status(),
        };
        self.status.send_if_modified(|status| {
            if *status == next {
                false
            } else {
                *status = next;
                true
            }
        });
    }
}

fn subscribe<T: Entity, R: RemoteStore>(remote: &R) -> Option<Subscription<T>> {
    match remote.subscribe::<T>() {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            tracing::warn!("Failed to subscribe to {}: {}", T::KIND, e);
            None
        }
    }
}

async fn next_snapshot<T>(subscription: &mut Option<Subscription<T>>) -> Option<Vec<T>> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
