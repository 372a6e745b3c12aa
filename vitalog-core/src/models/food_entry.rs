use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::entry_type::EntryType;
use super::meal_type::MealType;
use super::{normalize_tags, normalize_text};
use crate::error::ValidationError;

/// Longest observation accepted on a food entry, in characters.
pub const MAX_OBSERVATION_CHARS: usize = 280;

/// A single logged meal.
///
/// `id` and `created_at` are assigned once by [`FoodEntry::create`] and are
/// carried over unchanged by [`FoodEntry::updated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodEntry {
    pub id: Uuid,
    pub meal_type: MealType,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    /// Diet that was active when the meal was logged. May dangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_id: Option<Uuid>,
}

/// User input for a new food entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFoodEntry {
    pub meal_type: MealType,
    pub entry_type: EntryType,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub tags: Vec<String>,
    pub observation: Option<String>,
    pub diet_id: Option<Uuid>,
}

impl NewFoodEntry {
    pub fn new(meal_type: MealType, entry_type: EntryType) -> Self {
        Self {
            meal_type,
            entry_type,
            text: None,
            image_url: None,
            audio_url: None,
            tags: Vec::new(),
            observation: None,
            diet_id: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }

    pub fn with_diet_id(mut self, diet_id: Uuid) -> Self {
        self.diet_id = Some(diet_id);
        self
    }
}

/// Replacement values for an existing food entry. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodEntryUpdate {
    pub meal_type: Option<MealType>,
    pub text: Option<String>,
    /// An empty string clears the URL.
    pub image_url: Option<String>,
    /// An empty string clears the URL.
    pub audio_url: Option<String>,
    pub tags: Option<Vec<String>>,
    /// An empty string clears the observation.
    pub observation: Option<String>,
    /// `Some(None)` clears the diet reference.
    pub diet_id: Option<Option<Uuid>>,
}

impl FoodEntryUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl FoodEntry {
    /// Validates the input and builds a new entry with a fresh id and timestamp.
    pub fn create(input: NewFoodEntry) -> Result<Self, ValidationError> {
        let observation = check_observation(normalize_text(input.observation))?;

        Ok(Self {
            id: Uuid::new_v4(),
            meal_type: input.meal_type,
            created_at: Utc::now(),
            entry_type: input.entry_type,
            text: normalize_text(input.text),
            image_url: normalize_text(input.image_url),
            audio_url: normalize_text(input.audio_url),
            tags: normalize_tags(input.tags),
            observation,
            diet_id: input.diet_id,
        })
    }

    /// Returns a replacement entry with the update applied.
    pub fn updated(&self, update: FoodEntryUpdate) -> Result<Self, ValidationError> {
        let mut next = self.clone();

        if let Some(meal_type) = update.meal_type {
            next.meal_type = meal_type;
        }
        if let Some(text) = update.text {
            next.text = normalize_text(Some(text));
        }
        if let Some(url) = update.image_url {
            next.image_url = normalize_text(Some(url));
        }
        if let Some(url) = update.audio_url {
            next.audio_url = normalize_text(Some(url));
        }
        if let Some(tags) = update.tags {
            next.tags = normalize_tags(tags);
        }
        if let Some(observation) = update.observation {
            next.observation = check_observation(normalize_text(Some(observation)))?;
        }
        if let Some(diet_id) = update.diet_id {
            next.diet_id = diet_id;
        }

        Ok(next)
    }

    /// The populated content field for this entry's type, if any.
    pub fn content(&self) -> Option<&str> {
        match self.entry_type {
            EntryType::Text => self.text.as_deref(),
            EntryType::Image => self.image_url.as_deref(),
            EntryType::Audio => self.audio_url.as_deref(),
        }
    }
}

fn check_observation(observation: Option<String>) -> Result<Option<String>, ValidationError> {
    match observation {
        Some(text) => {
            let len = text.chars().count();
            if len > MAX_OBSERVATION_CHARS {
                return Err(ValidationError::ObservationTooLong {
                    len,
                    max: MAX_OBSERVATION_CHARS,
                });
            }
            Ok(Some(text))
        }
        None => Ok(None),
    }
}

impl fmt::Display for FoodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} - {} ({})",
            self.created_at.format("%Y-%m-%d %H:%M"),
            self.meal_type,
            self.entry_type
        )?;

        if let Some(content) = self.content() {
            writeln!(f, "  {}", content)?;
        }
        if !self.tags.is_empty() {
            writeln!(f, "  Tags: {}", self.tags.join(", "))?;
        }
        if let Some(observation) = &self.observation {
            writeln!(f, "  Observation: {}", observation)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_identity() {
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Lunch, EntryType::Text).with_text("Rice and beans"),
        )
        .unwrap();

        assert_eq!(entry.meal_type, MealType::Lunch);
        assert_eq!(entry.entry_type, EntryType::Text);
        assert_eq!(entry.text.as_deref(), Some("Rice and beans"));
        assert!(entry.tags.is_empty());
        assert!(entry.diet_id.is_none());
    }

    #[test]
    fn test_create_normalizes_tags() {
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Dinner, EntryType::Text)
                .with_tags([" veggie ", "", "protein", "veggie"]),
        )
        .unwrap();

        assert_eq!(entry.tags, vec!["veggie", "protein"]);
    }

    #[test]
    fn test_create_blank_observation_is_absent() {
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Snack, EntryType::Text).with_observation("   "),
        )
        .unwrap();

        assert!(entry.observation.is_none());
    }

    #[test]
    fn test_create_rejects_long_observation() {
        let long = "a".repeat(MAX_OBSERVATION_CHARS + 1);
        let result = FoodEntry::create(
            NewFoodEntry::new(MealType::Snack, EntryType::Text).with_observation(long),
        );

        assert_eq!(
            result.unwrap_err(),
            ValidationError::ObservationTooLong {
                len: MAX_OBSERVATION_CHARS + 1,
                max: MAX_OBSERVATION_CHARS,
            }
        );
    }

    #[test]
    fn test_observation_limit_counts_characters() {
        let accented = "é".repeat(MAX_OBSERVATION_CHARS);
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Snack, EntryType::Text).with_observation(accented),
        );

        assert!(entry.is_ok());
    }

    #[test]
    fn test_updated_keeps_id_and_created_at() {
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Breakfast, EntryType::Text).with_text("Oats"),
        )
        .unwrap();

        let updated = entry
            .updated(FoodEntryUpdate {
                meal_type: Some(MealType::Snack),
                text: Some("Oats with honey".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.created_at, entry.created_at);
        assert_eq!(updated.meal_type, MealType::Snack);
        assert_eq!(updated.text.as_deref(), Some("Oats with honey"));
    }

    #[test]
    fn test_updated_clears_diet_reference() {
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Lunch, EntryType::Text).with_diet_id(Uuid::new_v4()),
        )
        .unwrap();

        let updated = entry
            .updated(FoodEntryUpdate {
                diet_id: Some(None),
                ..Default::default()
            })
            .unwrap();

        assert!(updated.diet_id.is_none());
    }

    #[test]
    fn test_updated_replaces_and_clears_media_urls() {
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Dinner, EntryType::Image)
                .with_image_url("img/1.png")
                .with_audio_url("audio/1.m4a"),
        )
        .unwrap();

        let updated = entry
            .updated(FoodEntryUpdate {
                image_url: Some(" img/2.png ".to_string()),
                audio_url: Some(String::new()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.image_url.as_deref(), Some("img/2.png"));
        assert_eq!(updated.audio_url, None);
        assert_eq!(updated.content(), Some("img/2.png"));
        assert!(!FoodEntryUpdate {
            image_url: Some("img/3.png".to_string()),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_json_uses_document_field_names() {
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Dinner, EntryType::Image).with_image_url("img/1.png"),
        )
        .unwrap();

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["mealType"], "dinner");
        assert_eq!(json["imageUrl"], "img/1.png");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("observation").is_none());

        let parsed: FoodEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_display() {
        let entry = FoodEntry::create(
            NewFoodEntry::new(MealType::Dinner, EntryType::Text)
                .with_text("Soup")
                .with_tags(["warm"]),
        )
        .unwrap();

        let output = format!("{}", entry);
        assert!(output.contains("dinner"));
        assert!(output.contains("Soup"));
        assert!(output.contains("warm"));
    }
}
