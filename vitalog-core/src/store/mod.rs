//! Reactive local store holding the canonical in-memory copy of each
//! collection.

mod actions;
mod collection;
mod entity;
mod local;
mod state;

pub use collection::{items_from, Collection, Items};
pub use entity::{CollectionKind, Entity};
pub use local::LocalStore;
pub use state::{AuthState, Language, StoreState, Theme, UiState};

use thiserror::Error;
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Diet not found: {0}")]
    DietNotFound(Uuid),

    #[error("Food entry not found: {0}")]
    FoodEntryNotFound(Uuid),
}
