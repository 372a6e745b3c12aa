mod diet;
mod entry_type;
mod food_entry;
mod meal_type;

pub use diet::{AttachmentType, Diet, DietUpdate, NewDiet};
pub use entry_type::EntryType;
pub use food_entry::{FoodEntry, FoodEntryUpdate, NewFoodEntry, MAX_OBSERVATION_CHARS};
pub use meal_type::MealType;

/// Trims a free-text field; blank values become absent.
pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims tags, drops blanks and keeps the first occurrence of each.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
