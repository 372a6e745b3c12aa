//! The reactive local store.
//!
//! Holds the canonical in-memory copy of every collection plus UI and auth
//! state. Each committed change replaces the whole state snapshot and wakes
//! every subscriber with the new one.

use std::sync::Arc;
use tokio::sync::watch;

use super::collection::{items_from, Items};
use super::entity::Entity;
use super::state::{AuthState, StoreState, UiState};

#[derive(Clone)]
pub struct LocalStore {
    state: Arc<watch::Sender<Arc<StoreState>>>,
}

impl LocalStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(StoreState::default()));
        Self {
            state: Arc::new(tx),
        }
    }

    /// The current state. Cheap: only reference counts are touched.
    pub fn snapshot(&self) -> Arc<StoreState> {
        self.state.borrow().clone()
    }

    /// Receiver woken after every committed transition.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreState>> {
        self.state.subscribe()
    }

    /// Replaces a whole collection. Returns the collection version afterwards.
    pub fn replace_collection<T: Entity>(&self, entities: Vec<T>) -> u64 {
        self.replace_items(Arc::new(items_from(entities)))
    }

    pub(crate) fn replace_items<T: Entity>(&self, items: Arc<Items<T>>) -> u64 {
        let mut version = 0;
        self.state.send_if_modified(|state| {
            let mut next = StoreState::clone(&**state);
            let changed = T::collection_mut(&mut next).replace(items);
            version = T::collection(&next).version();
            if changed {
                *state = Arc::new(next);
            }
            changed
        });
        version
    }

    /// Runs `mutator` against a draft of one collection and commits the draft
    /// only if the mutator succeeds and actually changed something.
    ///
    /// The mutator runs while the store is locked and must not call back into
    /// the store.
    pub fn apply_mutation<T, R, E, F>(&self, mutator: F) -> Result<R, E>
    where
        T: Entity,
        F: FnOnce(&mut Items<T>) -> Result<R, E>,
    {
        let mut outcome = None;
        self.state.send_if_modified(|state| {
            let mut draft: Items<T> = (**T::collection(&**state).items()).clone();
            match mutator(&mut draft) {
                Ok(value) => {
                    outcome = Some(Ok(value));
                    let mut next = StoreState::clone(&**state);
                    let changed = T::collection_mut(&mut next).replace(Arc::new(draft));
                    if changed {
                        *state = Arc::new(next);
                    }
                    changed
                }
                Err(e) => {
                    outcome = Some(Err(e));
                    false
                }
            }
        });

        match outcome {
            Some(result) => result,
            None => unreachable!("send_if_modified always runs its closure"),
        }
    }

    pub fn update_ui(&self, update: impl FnOnce(&mut UiState)) {
        self.state.send_if_modified(|state| {
            let mut ui = state.ui.clone();
            update(&mut ui);
            if ui == state.ui {
                return false;
            }
            let mut next = StoreState::clone(&**state);
            next.ui = ui;
            *state = Arc::new(next);
            true
        });
    }

    pub(crate) fn set_auth(&self, auth: AuthState) {
        self.state.send_if_modified(|state| {
            if state.auth == auth {
                return false;
            }
            let mut next = StoreState::clone(&**state);
            next.auth = auth;
            *state = Arc::new(next);
            true
        });
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}
