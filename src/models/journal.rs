use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JournalEntry {
    pub id: String,
    pub trip_id: String,
    #[serde(skip)]
    pub owner_id: i64,
    pub title: String,
    pub content: String,
    pub location: Option<String>,
    pub media: Json<Vec<String>>,
    pub entry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(trip_id: impl Into<String>, owner_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.into(),
            owner_id,
            title: String::new(),
            content: String::new(),
            location: None,
            media: Json(Vec::new()),
            entry_date: now,
            created_at: now,
            updated_at: now,
        }
    }
}
