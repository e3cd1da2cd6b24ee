use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_TITLE_LEN: usize = 120;
/// Longest trip accepted, in days. Keeps itineraries to a sane size.
pub const MAX_TRIP_DAYS: i64 = 3 * 366;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: String,
    #[serde(skip)]
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destinations: Json<Vec<String>>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(owner_id: i64, title: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            title: title.into(),
            description: None,
            start_date: start,
            end_date: end,
            destinations: Json(Vec::new()),
            cover_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the invariants every stored trip must satisfy.
    pub fn validate(&self) -> Result<(), AppError> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::Validation(format!(
                "title must be between 1 and {MAX_TITLE_LEN} characters"
            )));
        }
        if self.end_date < self.start_date {
            return Err(AppError::Validation(
                "end_date must not be before start_date".into(),
            ));
        }
        if self.length_in_days() > MAX_TRIP_DAYS {
            return Err(AppError::Validation(format!(
                "a trip may span at most {MAX_TRIP_DAYS} days"
            )));
        }
        if self.destinations.0.iter().any(|d| d.trim().is_empty()) {
            return Err(AppError::Validation("destinations must not be blank".into()));
        }
        Ok(())
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    /// Inclusive number of calendar days the trip spans.
    pub fn length_in_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn phase(&self, today: NaiveDate) -> TripPhase {
        if today < self.start_date {
            TripPhase::Upcoming
        } else if today > self.end_date {
            TripPhase::Past
        } else {
            TripPhase::Ongoing
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripPhase {
    Upcoming,
    Ongoing,
    Past,
}
