//! Insights derived from the food log.
//!
//! Everything here is pure: each metric has an `_at` form taking the
//! reference time explicitly, and a convenience form using the local clock.
//! Days are calendar days in the time zone of the reference time.

mod streak;
mod weekly;

pub use streak::{food_logging_streak, food_logging_streak_at};
pub use weekly::{
    meal_coverage, meal_coverage_at, weekly_stats, weekly_stats_at, WeeklyStats,
};

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::models::FoodEntry;

/// All food-log insights at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub streak: u32,
    pub weekly: WeeklyStats,
    pub meal_coverage: f64,
}

pub fn insights<'a>(entries: impl IntoIterator<Item = &'a FoodEntry> + Clone) -> Insights {
    insights_at(entries, &Local::now())
}

pub fn insights_at<'a, Tz: TimeZone>(
    entries: impl IntoIterator<Item = &'a FoodEntry> + Clone,
    now: &DateTime<Tz>,
) -> Insights {
    Insights {
        streak: food_logging_streak_at(entries.clone(), now),
        weekly: weekly_stats_at(entries.clone(), now),
        meal_coverage: meal_coverage_at(entries, now),
    }
}

/// Rounds to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
