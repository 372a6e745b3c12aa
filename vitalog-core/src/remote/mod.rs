//! Remote document store boundary.
//!
//! Each principal owns one document collection per entity type; every
//! entity is stored as a document keyed by its id. Adapters never retry:
//! failures go straight back to the caller.

mod http;
mod memory;

pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::store::Entity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Serialization(e.to_string())
    }
}

/// Async CRUD, batch write and live subscription over the current
/// principal's collections.
///
/// Every call made without a signed-in principal fails with
/// [`RemoteError::Unauthenticated`] before any I/O happens.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Reads the whole collection.
    async fn fetch_all<T: Entity>(&self) -> Result<Vec<T>, RemoteError>;

    /// Writes or replaces one document.
    async fn upsert<T: Entity>(&self, entity: &T) -> Result<(), RemoteError>;

    /// Writes or replaces many documents in one all-or-nothing batch.
    async fn upsert_batch<T: Entity>(&self, entities: &[T]) -> Result<(), RemoteError>;

    /// Replaces the whole collection with `entities` in one write.
    ///
    /// Documents not in `entities` are deleted. Subscribers see exactly one
    /// snapshot for the write, even when nothing changed.
    async fn replace_all<T: Entity>(&self, entities: &[T]) -> Result<(), RemoteError>;

    /// Deletes one document. Deleting a missing document succeeds.
    async fn delete<T: Entity>(&self, id: Uuid) -> Result<(), RemoteError>;

    /// Delivers the full collection now and again after every remote change,
    /// in write order.
    fn subscribe<T: Entity>(&self) -> Result<Subscription<T>, RemoteError>;

    /// Deletes every document in every collection of the principal.
    ///
    /// Each collection is cleared in one batch and produces one snapshot,
    /// but collections are cleared one after another: a failure leaves
    /// earlier collections cleared.
    async fn clear_all(&self) -> Result<(), RemoteError>;
}

/// A live stream of full collection snapshots.
///
/// Unsubscribing is idempotent; once it returns, [`Subscription::next`]
/// yields `None` even if snapshots were already buffered.
pub struct Subscription<T> {
    receiver: Option<mpsc::UnboundedReceiver<Vec<T>>>,
    task: Option<AbortHandle>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Runs `feed` on the runtime; whatever it sends is delivered to the subscriber.
    pub fn spawn<F, Fut>(feed: F) -> Self
    where
        F: FnOnce(mpsc::UnboundedSender<Vec<T>>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(feed(tx));
        Self {
            receiver: Some(rx),
            task: Some(handle.abort_handle()),
        }
    }
}

impl<T> Subscription<T> {
    /// Next snapshot, or `None` once the feed ended or was unsubscribed.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        match self.receiver.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.receiver = None;
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_delivers_until_unsubscribed() {
        let mut sub: Subscription<u32> = Subscription::spawn(|tx| async move {
            let _ = tx.send(vec![1]);
            let _ = tx.send(vec![1, 2]);
            std::future::pending::<()>().await;
        });

        assert_eq!(sub.next().await, Some(vec![1]));

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(sub.next().await, None);
    }
}
