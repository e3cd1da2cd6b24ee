use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json as SqlJson;
use validator::Validate;

use super::{
    extract::{Json, Path},
    normalize_list,
    normalize_optional,
};
use crate::{
    auth::CurrentUser,
    db::{journal, trips},
    error::AppError,
    models::journal::JournalEntry,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/trips/:id/journal",
            get(list_entries).post(create_entry),
        )
        .route(
            "/journal/:id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct CreateEntry {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[serde(default)]
    #[validate(length(max = 50000))]
    content: String,
    location: Option<String>,
    #[serde(default)]
    media: Vec<String>,
    entry_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
struct UpdateEntry {
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
    #[validate(length(max = 50000))]
    content: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    location: Option<Option<String>>,
    media: Option<Vec<String>>,
    entry_date: Option<DateTime<Utc>>,
}

async fn list_entries(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<JournalEntry>>, AppError> {
    let user = current.require_user()?;
    trips::get_owned(&state.db, &trip_id, user.id).await?;
    Ok(Json(
        journal::list_for_trip(&state.db, &trip_id, user.id).await?,
    ))
}

async fn create_entry(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(req): Json<CreateEntry>,
) -> Result<(StatusCode, Json<JournalEntry>), AppError> {
    let user = current.require_user()?;
    req.validate()?;
    let trip = trips::get_owned(&state.db, &trip_id, user.id).await?;

    let mut entry = JournalEntry::new(trip.id, user.id);
    entry.title = non_blank_title(&req.title)?;
    entry.content = req.content;
    entry.location = normalize_optional(req.location);
    entry.media = SqlJson(normalize_list(req.media));
    if let Some(when) = req.entry_date {
        entry.entry_date = when;
    }

    journal::insert(&state.db, &entry).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn get_entry(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(entry_id): Path<String>,
) -> Result<Json<JournalEntry>, AppError> {
    let user = current.require_user()?;
    Ok(Json(journal::get_owned(&state.db, &entry_id, user.id).await?))
}

async fn update_entry(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(entry_id): Path<String>,
    Json(req): Json<UpdateEntry>,
) -> Result<Json<JournalEntry>, AppError> {
    let user = current.require_user()?;
    req.validate()?;

    let mut entry = journal::get_owned(&state.db, &entry_id, user.id).await?;
    if let Some(title) = req.title {
        entry.title = non_blank_title(&title)?;
    }
    if let Some(content) = req.content {
        entry.content = content;
    }
    if let Some(location) = req.location {
        entry.location = normalize_optional(location);
    }
    if let Some(media) = req.media {
        entry.media = SqlJson(normalize_list(media));
    }
    if let Some(when) = req.entry_date {
        entry.entry_date = when;
    }
    entry.updated_at = Utc::now();

    journal::update(&state.db, &entry).await?;
    Ok(Json(entry))
}

async fn delete_entry(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(entry_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    journal::delete_owned(&state.db, &entry_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn non_blank_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be blank".into()));
    }
    Ok(title.to_string())
}
