use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::collection::Collection;
use super::state::StoreState;
use crate::models::{Diet, FoodEntry};

/// The synchronized collections, one per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    Diets,
    FoodEntries,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 2] = [CollectionKind::Diets, CollectionKind::FoodEntries];

    /// Collection name in the remote document store.
    pub fn name(&self) -> &'static str {
        match self {
            CollectionKind::Diets => "diets",
            CollectionKind::FoodEntries => "foodEntries",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "diets" => Some(CollectionKind::Diets),
            "foodEntries" => Some(CollectionKind::FoodEntries),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record type kept in a synchronized collection.
pub trait Entity:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: CollectionKind;

    fn id(&self) -> Uuid;

    fn collection(state: &StoreState) -> &Collection<Self>;

    fn collection_mut(state: &mut StoreState) -> &mut Collection<Self>;
}

impl Entity for Diet {
    const KIND: CollectionKind = CollectionKind::Diets;

    fn id(&self) -> Uuid {
        self.id
    }

    fn collection(state: &StoreState) -> &Collection<Self> {
        &state.diets
    }

    fn collection_mut(state: &mut StoreState) -> &mut Collection<Self> {
        &mut state.diets
    }
}

impl Entity for FoodEntry {
    const KIND: CollectionKind = CollectionKind::FoodEntries;

    fn id(&self) -> Uuid {
        self.id
    }

    fn collection(state: &StoreState) -> &Collection<Self> {
        &state.food_entries
    }

    fn collection_mut(state: &mut StoreState) -> &mut Collection<Self> {
        &mut state.food_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names_roundtrip() {
        for kind in CollectionKind::ALL {
            assert_eq!(CollectionKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(CollectionKind::parse("habits"), None);
    }
}
