use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ActivityKind {
    Flight,
    Transport,
    Lodging,
    Food,
    Sightseeing,
    #[default]
    Activity,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: String,
    pub trip_id: String,
    #[serde(skip)]
    pub owner_id: i64,
    pub title: String,
    pub kind: ActivityKind,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        trip_id: impl Into<String>,
        owner_id: i64,
        title: impl Into<String>,
        kind: ActivityKind,
        starts_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.into(),
            owner_id,
            title: title.into(),
            kind,
            starts_at,
            location: None,
            description: None,
            created_at: Utc::now(),
        }
    }
}
