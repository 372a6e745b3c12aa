use thiserror::Error;

use crate::remote::RemoteError;
use crate::store::CollectionKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Failed to load remote data: {0}")]
    Session(String),

    #[error("Failed to push {kind}: {message}")]
    Push {
        kind: CollectionKind,
        message: String,
    },

    #[error("Sync controller stopped")]
    Stopped,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
