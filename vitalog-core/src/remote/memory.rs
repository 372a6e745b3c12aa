use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::{RemoteError, RemoteStore, Subscription};
use crate::auth::AuthSession;
use crate::store::{CollectionKind, Entity};

type Documents = BTreeMap<String, serde_json::Value>;

/// Snapshots are full state, so a short buffer is enough.
const UPDATE_BUFFER: usize = 64;

struct Channel {
    documents: Arc<Documents>,
    updates: broadcast::Sender<Arc<Documents>>,
}

impl Channel {
    fn new() -> Self {
        Self {
            documents: Arc::new(Documents::new()),
            updates: broadcast::channel(UPDATE_BUFFER).0,
        }
    }
}

type Channels = HashMap<(String, CollectionKind), Channel>;

/// In-process document store, namespaced by principal.
///
/// Clones share the same documents, so two clones bound to different
/// [`AuthSession`]s behave like two devices talking to one backend.
#[derive(Clone)]
pub struct MemoryRemoteStore {
    auth: AuthSession,
    channels: Arc<Mutex<Channels>>,
}

impl MemoryRemoteStore {
    pub fn new(auth: AuthSession) -> Self {
        Self {
            auth,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Another handle on the same documents, acting for a different session.
    pub fn connect(&self, auth: AuthSession) -> Self {
        Self {
            auth,
            channels: Arc::clone(&self.channels),
        }
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    fn with_channel<R>(
        &self,
        kind: CollectionKind,
        f: impl FnOnce(&mut Channel) -> R,
    ) -> Result<R, RemoteError> {
        let principal = self.auth.require()?;
        let mut channels = self
            .channels
            .lock()
            .map_err(|e| RemoteError::Storage(format!("Lock poisoned: {}", e)))?;
        let channel = channels
            .entry((principal.uid, kind))
            .or_insert_with(Channel::new);
        Ok(f(channel))
    }

    /// Applies `f` and publishes the result when `f` reports a write.
    fn write(
        &self,
        kind: CollectionKind,
        f: impl FnOnce(&mut Documents) -> bool,
    ) -> Result<(), RemoteError> {
        self.with_channel(kind, |channel| {
            let mut next = Documents::clone(&channel.documents);
            if f(&mut next) {
                channel.documents = Arc::new(next);
                // Nobody subscribed is fine.
                let _ = channel.updates.send(Arc::clone(&channel.documents));
            }
        })
    }
}

fn encode<T: Entity>(entities: &[T]) -> Result<Vec<(String, serde_json::Value)>, RemoteError> {
    entities
        .iter()
        .map(|e| Ok((e.id().to_string(), serde_json::to_value(e)?)))
        .collect()
}

fn decode<T: Entity>(docs: &Documents) -> Result<Vec<T>, RemoteError> {
    docs.values()
        .map(|value| serde_json::from_value(value.clone()).map_err(RemoteError::from))
        .collect()
}

impl RemoteStore for MemoryRemoteStore {
    async fn fetch_all<T: Entity>(&self) -> Result<Vec<T>, RemoteError> {
        let docs = self.with_channel(T::KIND, |channel| Arc::clone(&channel.documents))?;
        decode(&docs)
    }

    async fn upsert<T: Entity>(&self, entity: &T) -> Result<(), RemoteError> {
        self.upsert_batch(std::slice::from_ref(entity)).await
    }

    async fn upsert_batch<T: Entity>(&self, entities: &[T]) -> Result<(), RemoteError> {
        // Encode everything first so a bad document writes nothing.
        let encoded = encode(entities)?;
        self.write(T::KIND, |docs| {
            docs.extend(encoded);
            true
        })
    }

    async fn replace_all<T: Entity>(&self, entities: &[T]) -> Result<(), RemoteError> {
        let encoded = encode(entities)?;
        self.write(T::KIND, |docs| {
            *docs = encoded.into_iter().collect();
            true
        })
    }

    async fn delete<T: Entity>(&self, id: Uuid) -> Result<(), RemoteError> {
        self.write(T::KIND, |docs| docs.remove(&id.to_string()).is_some())
    }

    fn subscribe<T: Entity>(&self) -> Result<Subscription<T>, RemoteError> {
        let (initial, mut updates) = self.with_channel(T::KIND, |channel| {
            (Arc::clone(&channel.documents), channel.updates.subscribe())
        })?;

        Ok(Subscription::spawn(move |tx| async move {
            let mut next = Some(initial);
            loop {
                if let Some(docs) = next.take() {
                    match decode::<T>(&docs) {
                        Ok(items) => {
                            if tx.send(items).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!("Dropping undecodable {} snapshot: {}", T::KIND, e),
                    }
                }
                match updates.recv().await {
                    Ok(docs) => next = Some(docs),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("{} subscriber skipped {} snapshot(s)", T::KIND, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }

    async fn clear_all(&self) -> Result<(), RemoteError> {
        for kind in CollectionKind::ALL {
            self.write(kind, |docs| {
                docs.clear();
                true
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::models::{Diet, FoodEntry, MealType, NewDiet, NewFoodEntry, EntryType};

    fn signed_in(uid: &str) -> MemoryRemoteStore {
        let auth = AuthSession::new();
        auth.sign_in(Principal::new(uid));
        MemoryRemoteStore::new(auth)
    }

    fn diet(name: &str) -> Diet {
        Diet::create(NewDiet::new(name)).unwrap()
    }

    #[tokio::test]
    async fn test_calls_without_principal_fail() {
        let remote = MemoryRemoteStore::new(AuthSession::new());

        assert_eq!(
            remote.fetch_all::<Diet>().await.unwrap_err(),
            RemoteError::Unauthenticated
        );
        assert_eq!(
            remote.upsert(&diet("Keto")).await.unwrap_err(),
            RemoteError::Unauthenticated
        );
        assert_eq!(
            remote.delete::<Diet>(Uuid::new_v4()).await.unwrap_err(),
            RemoteError::Unauthenticated
        );
        assert!(matches!(
            remote.subscribe::<Diet>(),
            Err(RemoteError::Unauthenticated)
        ));
        assert_eq!(remote.clear_all().await.unwrap_err(), RemoteError::Unauthenticated);
    }

    #[tokio::test]
    async fn test_upsert_fetch_and_delete() {
        let remote = signed_in("alice");
        let keto = diet("Keto");
        let paleo = diet("Paleo");

        remote.upsert_batch(&[keto.clone(), paleo.clone()]).await.unwrap();
        let mut fetched: Vec<Diet> = remote.fetch_all().await.unwrap();
        fetched.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(fetched, vec![keto.clone(), paleo.clone()]);

        remote.delete::<Diet>(keto.id).await.unwrap();
        remote.delete::<Diet>(keto.id).await.unwrap();
        let fetched: Vec<Diet> = remote.fetch_all().await.unwrap();
        assert_eq!(fetched, vec![paleo]);
    }

    #[tokio::test]
    async fn test_collections_are_scoped_per_principal() {
        let alice = signed_in("alice");
        let bob_auth = AuthSession::new();
        bob_auth.sign_in(Principal::new("bob"));
        let bob = alice.connect(bob_auth);

        alice.upsert(&diet("Keto")).await.unwrap();

        let bobs: Vec<Diet> = bob.fetch_all().await.unwrap();
        assert!(bobs.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_sees_initial_and_later_snapshots() {
        let remote = signed_in("alice");
        let mut sub = remote.subscribe::<FoodEntry>().unwrap();

        assert_eq!(sub.next().await, Some(vec![]));

        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Lunch, EntryType::Text).with_text("Salad"),
        )
        .unwrap();
        remote.upsert(&entry).await.unwrap();

        assert_eq!(sub.next().await, Some(vec![entry]));
    }

    #[tokio::test]
    async fn test_clear_all_empties_every_collection() {
        let remote = signed_in("alice");
        remote.upsert(&diet("Keto")).await.unwrap();
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Snack, EntryType::Text).with_text("Apple"),
        )
        .unwrap();
        remote.upsert(&entry).await.unwrap();

        remote.clear_all().await.unwrap();

        assert!(remote.fetch_all::<Diet>().await.unwrap().is_empty());
        assert!(remote.fetch_all::<FoodEntry>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_all_removes_missing_documents() {
        let remote = signed_in("alice");
        let keto = diet("Keto");
        let paleo = diet("Paleo");
        remote.upsert_batch(&[keto.clone(), paleo.clone()]).await.unwrap();

        let vegan = diet("Vegan");
        remote.replace_all(&[paleo.clone(), vegan.clone()]).await.unwrap();

        let mut fetched: Vec<Diet> = remote.fetch_all().await.unwrap();
        fetched.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(fetched, vec![paleo, vegan]);
    }

    #[tokio::test]
    async fn test_subscription_delivers_every_write_in_order() {
        let remote = signed_in("alice");
        let mut sub = remote.subscribe::<Diet>().unwrap();
        assert_eq!(sub.next().await, Some(vec![]));

        let keto = diet("Keto");
        let paleo = diet("Paleo");
        remote.upsert(&keto).await.unwrap();
        remote.replace_all(&[paleo.clone()]).await.unwrap();
        remote.replace_all(&[paleo.clone()]).await.unwrap();

        assert_eq!(sub.next().await, Some(vec![keto]));
        assert_eq!(sub.next().await, Some(vec![paleo.clone()]));
        assert_eq!(sub.next().await, Some(vec![paleo]));
    }
}
