mod config_cmd;
mod diet;
mod entry;
mod export;
mod stats;

pub use config_cmd::ConfigCommand;
pub use diet::DietCommand;
pub use entry::{EntryCommand, LogArgs};
pub use export::{ExportArgs, WipeArgs};
pub use stats::StatsArgs;

use chrono::NaiveDate;
use clap::ValueEnum;
use uuid::Uuid;
use vitalog_core::{Diet, FoodEntry, StoreState};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Use YYYY-MM-DD.", value))
}

/// Finds a diet by id or case-insensitive name.
pub(crate) fn find_diet<'a>(state: &'a StoreState, reference: &str) -> Result<&'a Diet, String> {
    let found = match Uuid::parse_str(reference) {
        Ok(id) => state.diet(&id),
        Err(_) => state
            .diets
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(reference.trim())),
    };
    found.ok_or_else(|| format!("Diet not found: {}", reference))
}

/// Finds a food entry by id or unique id prefix.
pub(crate) fn find_entry<'a>(state: &'a StoreState, reference: &str) -> Result<&'a FoodEntry, String> {
    if let Ok(id) = Uuid::parse_str(reference) {
        return state
            .food_entry(&id)
            .ok_or_else(|| format!("Food entry not found: {}", reference));
    }

    let prefix = reference.trim().to_lowercase();
    let mut matches = state
        .food_entries
        .iter()
        .filter(|e| !prefix.is_empty() && e.id.to_string().starts_with(&prefix));
    match (matches.next(), matches.next()) {
        (Some(entry), None) => Ok(entry),
        (Some(_), Some(_)) => Err(format!("Ambiguous food entry id: {}", reference)),
        (None, _) => Err(format!("Food entry not found: {}", reference)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitalog_core::{EntryType, LocalStore, MealType, NewDiet, NewFoodEntry};

    #[test]
    fn test_find_diet_by_id_or_name() {
        let store = LocalStore::new();
        let keto = store.add_diet(NewDiet::new("Keto")).unwrap();
        let state = store.snapshot();

        assert_eq!(find_diet(&state, &keto.id.to_string()).unwrap().id, keto.id);
        assert_eq!(find_diet(&state, "keto").unwrap().id, keto.id);
        assert!(find_diet(&state, "paleo").is_err());
    }

    #[test]
    fn test_find_entry_by_prefix() {
        let store = LocalStore::new();
        let entry = store
            .add_food_entry(NewFoodEntry::new(MealType::Snack, EntryType::Text).with_text("Apple"))
            .unwrap();
        let state = store.snapshot();

        let prefix = &entry.id.to_string()[..8];
        assert_eq!(find_entry(&state, prefix).unwrap().id, entry.id);
        assert!(find_entry(&state, "").is_err());
        assert!(find_entry(&state, "zzzz").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("29/02/2024").is_err());
    }
}
