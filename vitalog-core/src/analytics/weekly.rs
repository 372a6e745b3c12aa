use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::round1;
use crate::models::{FoodEntry, MealType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub days_logged: usize,
    pub total_entries: usize,
    /// Entries per logged day, rounded to one decimal.
    pub average_entries_per_day: f64,
}

/// Entries created strictly after seven days before `now`.
fn last_seven_days<'a, Tz: TimeZone>(
    entries: impl IntoIterator<Item = &'a FoodEntry>,
    now: &DateTime<Tz>,
) -> impl Iterator<Item = &'a FoodEntry> {
    let cutoff = now.with_timezone(&Utc) - Duration::days(7);
    entries.into_iter().filter(move |e| e.created_at > cutoff)
}

pub fn weekly_stats<'a>(entries: impl IntoIterator<Item = &'a FoodEntry>) -> WeeklyStats {
    weekly_stats_at(entries, &Local::now())
}

pub fn weekly_stats_at<'a, Tz: TimeZone>(
    entries: impl IntoIterator<Item = &'a FoodEntry>,
    now: &DateTime<Tz>,
) -> WeeklyStats {
    let tz = now.timezone();
    let mut days = HashSet::new();
    let mut total_entries = 0;
    for entry in last_seven_days(entries, now) {
        days.insert(entry.created_at.with_timezone(&tz).date_naive());
        total_entries += 1;
    }

    let days_logged = days.len();
    let average_entries_per_day = if days_logged == 0 {
        0.0
    } else {
        round1(total_entries as f64 / days_logged as f64)
    };

    WeeklyStats {
        days_logged,
        total_entries,
        average_entries_per_day,
    }
}

pub fn meal_coverage<'a>(entries: impl IntoIterator<Item = &'a FoodEntry>) -> f64 {
    meal_coverage_at(entries, &Local::now())
}

/// Average number of distinct meal types per logged day over the last
/// seven days, rounded to one decimal. 0 when nothing was logged.
pub fn meal_coverage_at<'a, Tz: TimeZone>(
    entries: impl IntoIterator<Item = &'a FoodEntry>,
    now: &DateTime<Tz>,
) -> f64 {
    let tz = now.timezone();
    let mut meals_by_day: HashMap<NaiveDate, HashSet<MealType>> = HashMap::new();
    for entry in last_seven_days(entries, now) {
        meals_by_day
            .entry(entry.created_at.with_timezone(&tz).date_naive())
            .or_default()
            .insert(entry.meal_type);
    }

    if meals_by_day.is_empty() {
        return 0.0;
    }
    let distinct: usize = meals_by_day.values().map(HashSet::len).sum();
    round1(distinct as f64 / meals_by_day.len() as f64)
}
