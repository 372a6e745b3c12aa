//! JSON export of everything the signed-in user owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Diet, FoodEntry};
use crate::store::StoreState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub diets: Vec<Diet>,
    pub food_entries: Vec<FoodEntry>,
    pub exported_at: DateTime<Utc>,
}

impl ExportDocument {
    pub fn from_state(state: &StoreState) -> Self {
        Self::from_state_at(state, Utc::now())
    }

    /// Diets are ordered by name, entries oldest first.
    pub fn from_state_at(state: &StoreState, exported_at: DateTime<Utc>) -> Self {
        let mut food_entries = state.food_entries.to_vec();
        food_entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Self {
            diets: state.diets_by_name().into_iter().cloned().collect(),
            food_entries,
            exported_at,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// `vitalog-export-YYYY-MM-DD.json`, dated by the export time.
    pub fn file_name(&self) -> String {
        format!("vitalog-export-{}.json", self.exported_at.format("%Y-%m-%d"))
    }
}
