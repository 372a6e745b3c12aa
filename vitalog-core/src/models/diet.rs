use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::normalize_text;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Image,
    Pdf,
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentType::Image => write!(f, "image"),
            AttachmentType::Pdf => write!(f, "pdf"),
        }
    }
}

impl FromStr for AttachmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(AttachmentType::Image),
            "pdf" => Ok(AttachmentType::Pdf),
            other => Err(format!("Invalid attachment type: '{}'. Use image or pdf.", other)),
        }
    }
}

/// A diet plan the user follows.
///
/// At most one diet in a collection is active; activation goes through the
/// store's `set_active_diet` so the rest are switched off in the same
/// transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diet {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_type: Option<AttachmentType>,
    #[serde(default)]
    pub is_active: bool,
}

/// User input for a new diet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDiet {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub attachment: Option<(String, AttachmentType)>,
}

impl NewDiet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            start_date: None,
            end_date: None,
            notes: None,
            attachment: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_attachment(mut self, url: impl Into<String>, kind: AttachmentType) -> Self {
        self.attachment = Some((url.into(), kind));
        self
    }
}

/// Replacement values for an existing diet.
///
/// Blank name, description or notes keep the current value. Activation is
/// not part of an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DietUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub attachment: Option<(String, AttachmentType)>,
}

impl Diet {
    /// Validates the input and builds a new, inactive diet.
    pub fn create(input: NewDiet) -> Result<Self, ValidationError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyDietName);
        }
        check_date_range(input.start_date, input.end_date)?;

        let (attachment_url, attachment_type) = match input.attachment {
            Some((url, kind)) => match normalize_text(Some(url)) {
                Some(url) => (Some(url), Some(kind)),
                None => (None, None),
            },
            None => (None, None),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: normalize_text(input.description),
            start_date: input.start_date,
            end_date: input.end_date,
            notes: normalize_text(input.notes),
            attachment_url,
            attachment_type,
            is_active: false,
        })
    }

    /// Returns a replacement diet with the update merged in.
    pub fn updated(&self, update: DietUpdate) -> Result<Self, ValidationError> {
        let mut next = self.clone();

        if let Some(name) = normalize_text(update.name) {
            next.name = name;
        }
        if let Some(description) = normalize_text(update.description) {
            next.description = Some(description);
        }
        if let Some(notes) = normalize_text(update.notes) {
            next.notes = Some(notes);
        }
        if update.start_date.is_some() {
            next.start_date = update.start_date;
        }
        if update.end_date.is_some() {
            next.end_date = update.end_date;
        }
        if let Some((url, kind)) = update.attachment {
            next.attachment_url = normalize_text(Some(url));
            next.attachment_type = next.attachment_url.as_ref().map(|_| kind);
        }

        check_date_range(next.start_date, next.end_date)?;
        Ok(next)
    }
}

fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
    }
    Ok(())
}

impl fmt::Display for Diet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_active { " (active)" } else { "" };
        writeln!(f, "{}{}", self.name, marker)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count() + marker.len()))?;
        writeln!(f, "ID: {}", self.id)?;

        if let Some(description) = &self.description {
            writeln!(f, "{}", description)?;
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => writeln!(f, "Period: {} to {}", start, end)?,
            (Some(start), None) => writeln!(f, "Since: {}", start)?,
            (None, Some(end)) => writeln!(f, "Until: {}", end)?,
            (None, None) => {}
        }
        if let Some(notes) = &self.notes {
            writeln!(f, "\nNotes: {}", notes)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_create_trims_and_is_inactive() {
        let diet = Diet::create(
            NewDiet::new("  Mediterranean ")
                .with_description("  less red meat ")
                .with_notes("   "),
        )
        .unwrap();

        assert_eq!(diet.name, "Mediterranean");
        assert_eq!(diet.description.as_deref(), Some("less red meat"));
        assert!(diet.notes.is_none());
        assert!(!diet.is_active);
    }

    #[test]
    fn test_create_rejects_blank_name() {
        assert_eq!(
            Diet::create(NewDiet::new("   ")).unwrap_err(),
            ValidationError::EmptyDietName
        );
    }

    #[test]
    fn test_create_rejects_inverted_dates() {
        let result = Diet::create(
            NewDiet::new("Cut").with_dates(Some(date(2025, 3, 1)), Some(date(2025, 2, 1))),
        );
        assert!(matches!(
            result,
            Err(ValidationError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_create_with_attachment() {
        let diet = Diet::create(
            NewDiet::new("Keto").with_attachment("files/keto.pdf", AttachmentType::Pdf),
        )
        .unwrap();

        assert_eq!(diet.attachment_url.as_deref(), Some("files/keto.pdf"));
        assert_eq!(diet.attachment_type, Some(AttachmentType::Pdf));
    }

    #[test]
    fn test_updated_blank_name_keeps_previous() {
        let diet = Diet::create(NewDiet::new("Keto")).unwrap();

        let updated = diet
            .updated(DietUpdate {
                name: Some("  ".to_string()),
                notes: Some(" no sugar ".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.id, diet.id);
        assert_eq!(updated.name, "Keto");
        assert_eq!(updated.notes.as_deref(), Some("no sugar"));
    }

    #[test]
    fn test_updated_rechecks_date_range() {
        let diet = Diet::create(NewDiet::new("Bulk").with_dates(Some(date(2025, 1, 10)), None))
            .unwrap();

        let result = diet.updated(DietUpdate {
            end_date: Some(date(2025, 1, 1)),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let diet = Diet::create(
            NewDiet::new("Low carb").with_dates(Some(date(2025, 1, 1)), Some(date(2025, 2, 1))),
        )
        .unwrap();

        let json = serde_json::to_value(&diet).unwrap();
        assert_eq!(json["isActive"], false);
        assert_eq!(json["startDate"], "2025-01-01");

        let parsed: Diet = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, diet);
    }

    #[test]
    fn test_attachment_type_from_str() {
        assert_eq!("PDF".parse::<AttachmentType>().unwrap(), AttachmentType::Pdf);
        assert_eq!(AttachmentType::Image.to_string(), "image");
        assert!("video".parse::<AttachmentType>().is_err());
    }
}
