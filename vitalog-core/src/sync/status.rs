use std::fmt;

use super::error::SyncError;
use crate::store::{CollectionKind, StoreState};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    SignedOut,
    /// Seeding local collections from the remote store.
    Loading,
    Active,
    /// The initial load failed; nothing syncs until the principal changes.
    Failed(String),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::SignedOut => write!(f, "signed out"),
            SessionState::Loading => write!(f, "loading"),
            SessionState::Active => write!(f, "active"),
            SessionState::Failed(e) => write!(f, "failed ({})", e),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStatus {
    pub pushing: bool,
    pub subscribed: bool,
    /// Local version the controller has looked at most recently.
    pub observed_version: Option<u64>,
    /// Local version known to match the remote store.
    pub acknowledged_version: Option<u64>,
    /// Error of the most recent failed push, cleared by the next attempt.
    pub last_error: Option<String>,
}

/// Snapshot of what the sync controller is doing, published after every step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub session: SessionState,
    pub diets: CollectionStatus,
    pub food_entries: CollectionStatus,
}

impl SyncStatus {
    pub fn collection(&self, kind: CollectionKind) -> &CollectionStatus {
        match kind {
            CollectionKind::Diets => &self.diets,
            CollectionKind::FoodEntries => &self.food_entries,
        }
    }

    /// True once the controller has reacted to the collections in `state`.
    pub fn has_observed(&self, state: &StoreState) -> bool {
        self.diets.observed_version == Some(state.diets.version())
            && self.food_entries.observed_version == Some(state.food_entries.version())
    }

    /// True when the session is active and every collection in `state` has
    /// been acknowledged by the remote store.
    pub fn is_synced(&self, state: &StoreState) -> bool {
        self.session == SessionState::Active
            && !self.diets.pushing
            && !self.food_entries.pushing
            && self.diets.acknowledged_version == Some(state.diets.version())
            && self.food_entries.acknowledged_version == Some(state.food_entries.version())
    }

    /// The first failed push that is not being retried.
    pub fn push_failure(&self) -> Option<SyncError> {
        CollectionKind::ALL.into_iter().find_map(|kind| {
            let status = self.collection(kind);
            match (&status.last_error, status.pushing) {
                (Some(message), false) => Some(SyncError::Push {
                    kind,
                    message: message.clone(),
                }),
                _ => None,
            }
        })
    }
}
