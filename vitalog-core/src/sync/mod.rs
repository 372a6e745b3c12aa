//! Keeps the local store and the remote store in agreement for the
//! signed-in principal.
//!
//! Local changes are pushed as diffs against the last confirmed remote
//! content. Remote snapshots replace local collections unless they are an
//! echo of a write local state has already moved past.

mod collection;
mod controller;
mod error;
mod handle;
mod status;

pub use controller::SyncController;
pub use error::SyncError;
pub use handle::SyncHandle;
pub use status::{CollectionStatus, SessionState, SyncStatus};
