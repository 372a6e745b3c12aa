//! Validation errors raised by the entity factories.
//!
//! These are returned before any store transition is attempted, so a
//! rejected input never reaches the local store.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Diet name is required")]
    EmptyDietName,

    #[error("Observation is {len} characters long (max {max})")]
    ObservationTooLong { len: usize, max: usize },

    #[error("End date {end} is before start date {start}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}
