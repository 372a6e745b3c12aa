use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use super::entity::Entity;

/// Entities of one type keyed by id.
pub type Items<T> = BTreeMap<Uuid, T>;

/// Builds an id-keyed map from a list of entities. Later duplicates win.
pub fn items_from<T: Entity>(entities: impl IntoIterator<Item = T>) -> Items<T> {
    entities.into_iter().map(|e| (e.id(), e)).collect()
}

/// An immutable snapshot of one collection.
///
/// Every committed change produces a new `Arc` and bumps `version`, so two
/// snapshots with the same version are guaranteed to hold the same items.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Arc<Items<T>>,
    version: u64,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(BTreeMap::new()),
            version: 0,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn get(&self, id: &Uuid) -> Option<&T> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.items.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + Clone {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &Arc<Items<T>> {
        &self.items
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }

    /// True when `other` holds exactly these items.
    pub fn same_items(&self, other: &Arc<Items<T>>) -> bool {
        Arc::ptr_eq(&self.items, other) || *self.items == **other
    }

    /// Swaps in new items. Equal contents are a no-op and keep the version.
    pub(crate) fn replace(&mut self, items: Arc<Items<T>>) -> bool {
        if self.same_items(&items) {
            return false;
        }
        self.items = items;
        self.version += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Diet, NewDiet};

    fn diet(name: &str) -> Diet {
        Diet::create(NewDiet::new(name)).unwrap()
    }

    #[test]
    fn test_replace_bumps_version() {
        let mut collection: Collection<Diet> = Collection::default();
        assert_eq!(collection.version(), 0);

        let changed = collection.replace(Arc::new(items_from(vec![diet("A")])));
        assert!(changed);
        assert_eq!(collection.version(), 1);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_replace_with_equal_items_is_noop() {
        let d = diet("A");
        let mut collection: Collection<Diet> = Collection::default();
        collection.replace(Arc::new(items_from(vec![d.clone()])));

        let changed = collection.replace(Arc::new(items_from(vec![d])));
        assert!(!changed);
        assert_eq!(collection.version(), 1);
    }

    #[test]
    fn test_items_from_keys_by_id() {
        let a = diet("A");
        let items = items_from(vec![a.clone(), diet("B")]);
        assert_eq!(items.len(), 2);
        assert_eq!(items.get(&a.id), Some(&a));
    }
}
