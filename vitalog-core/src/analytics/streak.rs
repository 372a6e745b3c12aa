use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::collections::HashSet;

use crate::models::FoodEntry;

pub fn food_logging_streak<'a>(entries: impl IntoIterator<Item = &'a FoodEntry>) -> u32 {
    food_logging_streak_at(entries, &Local::now())
}

/// Number of consecutive days with at least one entry, counted back from
/// today. A day that has not been logged yet does not break the streak:
/// counting starts from yesterday instead. Returns 0 when neither today nor
/// yesterday has an entry.
pub fn food_logging_streak_at<'a, Tz: TimeZone>(
    entries: impl IntoIterator<Item = &'a FoodEntry>,
    now: &DateTime<Tz>,
) -> u32 {
    let tz = now.timezone();
    let days: HashSet<NaiveDate> = entries
        .into_iter()
        .map(|e| e.created_at.with_timezone(&tz).date_naive())
        .collect();

    let today = now.date_naive();
    let mut day = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryType, MealType, NewFoodEntry};
    use chrono::{Duration, FixedOffset, Utc};

    fn entry_at(created_at: DateTime<Utc>) -> FoodEntry {
        FoodEntry {
            created_at,
            ..FoodEntry::create(NewFoodEntry::new(MealType::Lunch, EntryType::Text).with_text("x"))
                .unwrap()
        }
    }

    fn noon(days_ago: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap() - Duration::days(days_ago)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_log_has_no_streak() {
        assert_eq!(food_logging_streak_at(&[], &now()), 0);
    }

    #[test]
    fn test_streak_counts_back_from_today() {
        let entries = vec![entry_at(noon(0)), entry_at(noon(1)), entry_at(noon(2)), entry_at(noon(4))];
        assert_eq!(food_logging_streak_at(&entries, &now()), 3);
    }

    #[test]
    fn test_unlogged_today_starts_from_yesterday() {
        let entries = vec![entry_at(noon(1)), entry_at(noon(2))];
        assert_eq!(food_logging_streak_at(&entries, &now()), 2);
    }

    #[test]
    fn test_gap_of_two_days_resets_streak() {
        let entries = vec![entry_at(noon(2)), entry_at(noon(3))];
        assert_eq!(food_logging_streak_at(&entries, &now()), 0);
    }

    #[test]
    fn test_several_entries_on_one_day_count_once() {
        let entries = vec![entry_at(noon(0)), entry_at(noon(0) + Duration::hours(1))];
        assert_eq!(food_logging_streak_at(&entries, &now()), 1);
    }

    #[test]
    fn test_days_follow_the_reference_time_zone() {
        // 23:30 UTC on the 19th is already the 20th in UTC+3.
        let late = Utc.with_ymd_and_hms(2024, 3, 19, 23, 30, 0).unwrap();
        let entries = vec![entry_at(late)];
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        let now_plus_three = Utc.with_ymd_and_hms(2024, 3, 21, 8, 0, 0).unwrap().with_timezone(&plus_three);

        // In UTC+3 the entry is on the 20th, yesterday relative to the 21st.
        assert_eq!(food_logging_streak_at(&entries, &now_plus_three), 1);
        // In UTC it is on the 19th, two days before the 21st.
        let now_utc = Utc.with_ymd_and_hms(2024, 3, 21, 8, 0, 0).unwrap();
        assert_eq!(food_logging_streak_at(&entries, &now_utc), 0);
    }
}
