use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::collection::Collection;
use crate::auth::Principal;
use crate::models::{Diet, FoodEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Pt => write!(f, "pt"),
            Language::En => write!(f, "en"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pt" => Ok(Language::Pt),
            "en" => Ok(Language::En),
            _ => Err(format!("Unsupported language '{}'. Valid options: pt, en", s)),
        }
    }
}

/// Client-side preferences. Never synchronized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub theme: Theme,
    pub sidebar_open: bool,
    pub sidebar_collapsed: bool,
    pub language: Language,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            sidebar_open: true,
            sidebar_collapsed: false,
            language: Language::Pt,
        }
    }
}

/// Who is signed in, as last seen by the sync controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub principal: Option<Principal>,
    /// True while a session is being seeded from the remote store.
    pub loading: bool,
}

/// Everything the local store holds. Snapshots are shared and never mutated.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub diets: Collection<Diet>,
    pub food_entries: Collection<FoodEntry>,
    pub ui: UiState,
    pub auth: AuthState,
}

impl StoreState {
    pub fn diet(&self, id: &Uuid) -> Option<&Diet> {
        self.diets.get(id)
    }

    pub fn food_entry(&self, id: &Uuid) -> Option<&FoodEntry> {
        self.food_entries.get(id)
    }

    pub fn active_diet(&self) -> Option<&Diet> {
        self.diets.iter().find(|d| d.is_active)
    }

    /// Looks up the diet an entry points at. A deleted diet resolves to `None`.
    pub fn resolve_diet(&self, entry: &FoodEntry) -> Option<&Diet> {
        entry.diet_id.as_ref().and_then(|id| self.diets.get(id))
    }

    pub fn diets_by_name(&self) -> Vec<&Diet> {
        let mut diets: Vec<&Diet> = self.diets.iter().collect();
        diets.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        diets
    }

    pub fn entries_newest_first(&self) -> Vec<&FoodEntry> {
        let mut entries: Vec<&FoodEntry> = self.food_entries.iter().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }
}
