//! Per-collection bookkeeping for the sync controller.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::sync::Arc;

use super::status::CollectionStatus;
use crate::remote::{RemoteError, RemoteStore, Subscription};
use crate::store::{items_from, Collection, CollectionKind, Entity, Items, LocalStore};

/// A local snapshot together with the collection version it had.
pub(crate) struct Snapshot<T> {
    version: u64,
    items: Arc<Items<T>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            items: Arc::clone(&self.items),
        }
    }
}

impl<T: Entity> Snapshot<T> {
    fn of(collection: &Collection<T>) -> Self {
        Self {
            version: collection.version(),
            items: Arc::clone(collection.items()),
        }
    }
}

pub(crate) struct PushOutcome {
    pub kind: CollectionKind,
    pub result: Result<(), RemoteError>,
}

pub(crate) type PushFuture = LocalBoxFuture<'static, PushOutcome>;

/// Sync state of one collection.
///
/// Every push replaces the whole remote collection in one write, and the
/// remote delivers snapshots in write order. A snapshot arriving before the
/// echo of our latest write is therefore older than that write and is
/// dropped. One arriving after the echo but while a push is still in flight
/// is held back and applied once the push settles, unless local changes
/// made meanwhile overwrite it with the next push.
pub(crate) struct CollectionSync<T> {
    /// Last local state known to match the remote store.
    acknowledged: Option<Snapshot<T>>,
    /// Latest remote content we know of.
    remote: Option<Arc<Items<T>>>,
    in_flight: Option<Snapshot<T>>,
    /// Content of our latest write until its snapshot comes back.
    awaiting_echo: Option<Arc<Items<T>>>,
    /// Remote snapshot held back until the local side settles.
    pending: Option<Arc<Items<T>>>,
    pub(crate) subscription: Option<Subscription<T>>,
    /// Local version seen by the latest reconcile.
    observed: Option<u64>,
    last_error: Option<String>,
}

impl<T: Entity> CollectionSync<T> {
    pub fn new() -> Self {
        Self {
            acknowledged: None,
            remote: None,
            in_flight: None,
            awaiting_echo: None,
            pending: None,
            subscription: None,
            observed: None,
            last_error: None,
        }
    }

    fn is_acknowledged(&self, current: &Collection<T>) -> bool {
        self.acknowledged.as_ref().is_some_and(|ack| {
            ack.version == current.version() || current.same_items(&ack.items)
        })
    }

    fn acknowledge(&mut self, current: &Collection<T>) {
        self.acknowledged = Some(Snapshot::of(current));
    }

    fn has_observed(&self, store: &LocalStore) -> bool {
        self.observed == Some(T::collection(&store.snapshot()).version())
    }

    /// Makes local and remote state the same content, both acknowledged.
    pub fn seed(&mut self, store: &LocalStore, items: Vec<T>) {
        self.seed_from(store, Arc::new(items_from(items)));
    }

    /// Seeds an empty collection after the remote was wiped. Snapshots
    /// written before the wipe are dropped until the empty one arrives.
    pub fn cleared(&mut self, store: &LocalStore) {
        let empty = Arc::new(Items::<T>::new());
        self.seed_from(store, Arc::clone(&empty));
        self.awaiting_echo = Some(empty);
    }

    pub fn receive(&mut self, store: &LocalStore, items: Vec<T>) {
        let incoming = Arc::new(items_from(items));

        if let Some(expected) = &self.awaiting_echo {
            if **expected != *incoming {
                tracing::debug!(
                    "Dropping {} snapshot older than our last write ({} items)",
                    T::KIND,
                    incoming.len()
                );
                return;
            }
            self.awaiting_echo = None;
            self.remote = Some(incoming);
            return;
        }
        self.remote = Some(Arc::clone(&incoming));

        if self.in_flight.is_some() || !self.has_observed(store) {
            tracing::debug!("Holding back {} snapshot ({} items)", T::KIND, incoming.len());
            self.pending = Some(incoming);
            return;
        }
        self.pending = None;
        self.apply(store, incoming);
    }

    fn apply(&mut self, store: &LocalStore, incoming: Arc<Items<T>>) {
        let state = store.snapshot();
        let current = T::collection(&state);
        if current.same_items(&incoming) {
            self.acknowledge(current);
            return;
        }

        tracing::debug!("Applying remote {} snapshot ({} items)", T::KIND, incoming.len());
        self.seed_from(store, incoming);
    }

    fn seed_from(&mut self, store: &LocalStore, items: Arc<Items<T>>) {
        let version = store.replace_items(Arc::clone(&items));
        self.acknowledged = Some(Snapshot {
            version,
            items: Arc::clone(&items),
        });
        self.remote = Some(items);
        self.observed = Some(version);
        self.awaiting_echo = None;
        self.pending = None;
    }

    /// Starts a push if local state differs from what was last acknowledged.
    ///
    /// At most one push per collection is in flight; changes made meanwhile
    /// are picked up when it completes.
    pub fn reconcile<R: RemoteStore + 'static>(
        &mut self,
        store: &LocalStore,
        remote: &Arc<R>,
    ) -> Option<PushFuture> {
        let state = store.snapshot();
        let current = T::collection(&state);
        self.observed = Some(current.version());
        if self.in_flight.is_some() {
            return None;
        }

        if let Some(incoming) = self.pending.take() {
            if self.is_acknowledged(current) {
                self.apply(store, incoming);
                return None;
            }
            tracing::debug!("Local {} changes overwrite a held-back snapshot", T::KIND);
        }

        if self.is_acknowledged(current)
            || self.remote.as_ref().is_some_and(|remote| current.same_items(remote))
        {
            self.acknowledge(current);
            return None;
        }

        tracing::debug!("Pushing {} ({} items)", T::KIND, current.len());
        let pushed = Snapshot::of(current);
        self.awaiting_echo = Some(Arc::clone(&pushed.items));
        self.in_flight = Some(pushed);
        self.last_error = None;

        let items = current.to_vec();
        let remote = Arc::clone(remote);
        Some(
            async move {
                let result = remote.replace_all(&items).await;
                PushOutcome {
                    kind: T::KIND,
                    result,
                }
            }
            .boxed_local(),
        )
    }

    pub fn complete(&mut self, result: Result<(), RemoteError>) {
        let Some(pushed) = self.in_flight.take() else {
            return;
        };

        match result {
            Ok(()) => {
                tracing::debug!("Pushed {} version {}", T::KIND, pushed.version);
                if self.pending.is_none() {
                    self.remote = Some(Arc::clone(&pushed.items));
                }
                self.acknowledged = Some(pushed);
            }
            Err(e) => {
                tracing::warn!("Failed to push {}: {}", T::KIND, e);
                // If the write landed after all, its snapshot is applied like any other.
                self.awaiting_echo = None;
                self.acknowledged = None;
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Forgets a push whose future was dropped.
    pub fn abandon_push(&mut self) {
        if self.in_flight.take().is_some() {
            self.acknowledged = None;
        }
        self.awaiting_echo = None;
        self.pending = None;
    }

    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn reset(&mut self) {
        self.unsubscribe();
        *self = Self::new();
    }

    pub fn status(&self) -> CollectionStatus {
        CollectionStatus {
            pushing: self.in_flight.is_some(),
            subscribed: self.subscription.is_some(),
            observed_version: self.observed,
            acknowledged_version: self.acknowledged.as_ref().map(|ack| ack.version),
            last_error: self.last_error.clone(),
        }
    }
}
