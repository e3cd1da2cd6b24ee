use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Media {
    pub id: String,
    #[serde(skip)]
    pub owner_id: i64,
    pub trip_id: String,
    pub storage_key: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub caption: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// A file that has been written to storage but not yet attached to a trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredObject {
    pub storage_key: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
}
