//! Typed operations on the local store.
//!
//! Every operation validates its input first and then commits through
//! [`LocalStore::apply_mutation`] or [`LocalStore::update_ui`], so the sync
//! controller sees each change as one transition.

use std::convert::Infallible;
use uuid::Uuid;

use super::collection::Items;
use super::local::LocalStore;
use super::state::{Language, Theme};
use super::StoreError;
use crate::models::{Diet, DietUpdate, FoodEntry, FoodEntryUpdate, NewDiet, NewFoodEntry};

impl LocalStore {
    pub fn add_diet(&self, input: NewDiet) -> Result<Diet, StoreError> {
        let diet = Diet::create(input)?;
        self.apply_mutation(|diets: &mut Items<Diet>| -> Result<(), StoreError> {
            diets.insert(diet.id, diet.clone());
            Ok(())
        })?;
        Ok(diet)
    }

    pub fn update_diet(&self, id: Uuid, update: DietUpdate) -> Result<Diet, StoreError> {
        self.apply_mutation(|diets: &mut Items<Diet>| -> Result<Diet, StoreError> {
            let current = diets.get(&id).ok_or(StoreError::DietNotFound(id))?;
            let next = current.updated(update)?;
            diets.insert(id, next.clone());
            Ok(next)
        })
    }

    /// Removes a diet. Entries that reference it keep the dangling id.
    pub fn delete_diet(&self, id: Uuid) -> Result<Diet, StoreError> {
        self.apply_mutation(|diets: &mut Items<Diet>| -> Result<Diet, StoreError> {
            diets.remove(&id).ok_or(StoreError::DietNotFound(id))
        })
    }

    /// Activates one diet and deactivates every other one in the same transition.
    pub fn set_active_diet(&self, id: Uuid) -> Result<(), StoreError> {
        self.apply_mutation(|diets: &mut Items<Diet>| -> Result<(), StoreError> {
            if !diets.contains_key(&id) {
                return Err(StoreError::DietNotFound(id));
            }
            for diet in diets.values_mut() {
                diet.is_active = diet.id == id;
            }
            Ok(())
        })
    }

    pub fn deactivate_all_diets(&self) {
        let result = self.apply_mutation(|diets: &mut Items<Diet>| -> Result<(), Infallible> {
            for diet in diets.values_mut() {
                diet.is_active = false;
            }
            Ok(())
        });
        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    pub fn add_food_entry(&self, input: NewFoodEntry) -> Result<FoodEntry, StoreError> {
        let entry = FoodEntry::create(input)?;
        self.apply_mutation(|entries: &mut Items<FoodEntry>| -> Result<(), StoreError> {
            entries.insert(entry.id, entry.clone());
            Ok(())
        })?;
        Ok(entry)
    }

    pub fn update_food_entry(
        &self,
        id: Uuid,
        update: FoodEntryUpdate,
    ) -> Result<FoodEntry, StoreError> {
        self.apply_mutation(
            |entries: &mut Items<FoodEntry>| -> Result<FoodEntry, StoreError> {
                let current = entries.get(&id).ok_or(StoreError::FoodEntryNotFound(id))?;
                let next = current.updated(update)?;
                entries.insert(id, next.clone());
                Ok(next)
            },
        )
    }

    pub fn delete_food_entry(&self, id: Uuid) -> Result<FoodEntry, StoreError> {
        self.apply_mutation(
            |entries: &mut Items<FoodEntry>| -> Result<FoodEntry, StoreError> {
                entries.remove(&id).ok_or(StoreError::FoodEntryNotFound(id))
            },
        )
    }

    pub fn set_theme(&self, theme: Theme) {
        self.update_ui(|ui| ui.theme = theme);
    }

    pub fn toggle_theme(&self) {
        self.update_ui(|ui| {
            ui.theme = match ui.theme {
                Theme::Light => Theme::Dark,
                Theme::Dark => Theme::Light,
            }
        });
    }

    pub fn set_language(&self, language: Language) {
        self.update_ui(|ui| ui.language = language);
    }

    pub fn toggle_sidebar(&self) {
        self.update_ui(|ui| ui.sidebar_open = !ui.sidebar_open);
    }

    pub fn toggle_sidebar_collapse(&self) {
        self.update_ui(|ui| ui.sidebar_collapsed = !ui.sidebar_collapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::models::{EntryType, MealType};

    fn active_count(store: &LocalStore) -> usize {
        store.snapshot().diets.iter().filter(|d| d.is_active).count()
    }

    #[test]
    fn test_add_diet_rejects_invalid_input_before_commit() {
        let store = LocalStore::new();
        let mut rx = store.subscribe();

        let result = store.add_diet(NewDiet::new(" "));

        assert_eq!(
            result.unwrap_err(),
            StoreError::Validation(ValidationError::EmptyDietName)
        );
        assert!(!rx.has_changed().unwrap());
        assert!(store.snapshot().diets.is_empty());
    }

    #[test]
    fn test_set_active_leaves_exactly_one_active() {
        let store = LocalStore::new();
        let a = store.add_diet(NewDiet::new("A")).unwrap();
        let b = store.add_diet(NewDiet::new("B")).unwrap();
        store.add_diet(NewDiet::new("C")).unwrap();

        store.set_active_diet(a.id).unwrap();
        assert_eq!(active_count(&store), 1);

        store.set_active_diet(b.id).unwrap();
        assert_eq!(active_count(&store), 1);
        assert_eq!(store.snapshot().active_diet().map(|d| d.id), Some(b.id));
    }

    #[test]
    fn test_set_active_unknown_id_keeps_current_state() {
        let store = LocalStore::new();
        let a = store.add_diet(NewDiet::new("A")).unwrap();
        store.set_active_diet(a.id).unwrap();
        let version = store.snapshot().diets.version();

        let missing = Uuid::new_v4();
        assert_eq!(
            store.set_active_diet(missing),
            Err(StoreError::DietNotFound(missing))
        );
        assert_eq!(active_count(&store), 1);
        assert_eq!(store.snapshot().diets.version(), version);
    }

    #[test]
    fn test_deactivate_all() {
        let store = LocalStore::new();
        let a = store.add_diet(NewDiet::new("A")).unwrap();
        store.add_diet(NewDiet::new("B")).unwrap();
        store.set_active_diet(a.id).unwrap();

        store.deactivate_all_diets();
        assert_eq!(active_count(&store), 0);

        // Nothing left to deactivate: no transition.
        let version = store.snapshot().diets.version();
        store.deactivate_all_diets();
        assert_eq!(store.snapshot().diets.version(), version);
    }

    #[test]
    fn test_update_diet_cannot_reactivate() {
        let store = LocalStore::new();
        let a = store.add_diet(NewDiet::new("A")).unwrap();

        let updated = store
            .update_diet(
                a.id,
                DietUpdate {
                    name: Some("A2".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "A2");
        assert!(!updated.is_active);
    }

    #[test]
    fn test_deleted_diet_resolves_to_none() {
        let store = LocalStore::new();
        let diet = store.add_diet(NewDiet::new("Keto")).unwrap();
        let entry = store
            .add_food_entry(
                NewFoodEntry::new(MealType::Lunch, EntryType::Text).with_diet_id(diet.id),
            )
            .unwrap();

        assert_eq!(
            store.snapshot().resolve_diet(&entry).map(|d| d.id),
            Some(diet.id)
        );

        store.delete_diet(diet.id).unwrap();
        let state = store.snapshot();
        let stored = state.food_entry(&entry.id).unwrap();
        assert_eq!(stored.diet_id, Some(diet.id));
        assert!(state.resolve_diet(stored).is_none());
    }

    #[test]
    fn test_food_entry_roundtrip_through_store() {
        let store = LocalStore::new();
        let created = store
            .add_food_entry(
                NewFoodEntry::new(MealType::Breakfast, EntryType::Text)
                    .with_text("Eggs")
                    .with_tags(["protein"]),
            )
            .unwrap();

        let fetched = store.snapshot().food_entry(&created.id).cloned().unwrap();
        assert_eq!(fetched, created);

        let updated = store
            .update_food_entry(
                created.id,
                FoodEntryUpdate {
                    text: Some("Eggs and toast".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.tags, created.tags);
    }

    #[test]
    fn test_delete_missing_entry() {
        let store = LocalStore::new();
        let id = Uuid::new_v4();
        assert_eq!(
            store.delete_food_entry(id),
            Err(StoreError::FoodEntryNotFound(id))
        );
    }

    #[test]
    fn test_ui_preferences() {
        let store = LocalStore::new();
        store.toggle_theme();
        store.set_language(Language::En);
        store.toggle_sidebar();

        let ui = store.snapshot().ui.clone();
        assert_eq!(ui.theme, Theme::Dark);
        assert_eq!(ui.language, Language::En);
        assert!(!ui.sidebar_open);
    }
}
