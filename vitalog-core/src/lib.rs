//! Vitalog Core Library
//!
//! Models, the reactive local store, remote store adapters, the sync
//! controller and food-log insights shared by the Vitalog binaries.

pub mod analytics;
pub mod auth;
pub mod error;
pub mod export;
pub mod models;
pub mod remote;
pub mod store;
pub mod sync;

pub use analytics::{Insights, WeeklyStats};
pub use auth::{AuthSession, Principal};
pub use error::ValidationError;
pub use export::ExportDocument;
pub use models::{
    AttachmentType, Diet, DietUpdate, EntryType, FoodEntry, FoodEntryUpdate, MealType, NewDiet,
    NewFoodEntry,
};
pub use remote::{HttpRemoteStore, MemoryRemoteStore, RemoteError, RemoteStore, Subscription};
pub use store::{CollectionKind, Entity, LocalStore, StoreError, StoreState};
pub use sync::{SessionState, SyncController, SyncError, SyncHandle, SyncStatus};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
