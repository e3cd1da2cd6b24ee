use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::types::Json as SqlJson;
use tracing::{info, warn};
use validator::Validate;

use super::{
    extract::{Json, Path},
    normalize_list,
    normalize_optional,
};
use crate::{
    auth::CurrentUser,
    db::{media, trips},
    error::AppError,
    models::trip::Trip,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route(
            "/trips/:id",
            get(get_trip).put(update_trip).delete(delete_trip),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct CreateTrip {
    #[validate(length(min = 1, max = 120))]
    title: String,
    #[validate(length(max = 5000))]
    description: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default)]
    destinations: Vec<String>,
    cover_image: Option<String>,
}

/// Absent fields stay as they are; `null` clears the nullable ones.
#[derive(Debug, Default, Deserialize, Validate)]
struct UpdateTrip {
    #[validate(length(min = 1, max = 120))]
    title: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    description: Option<Option<String>>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    destinations: Option<Vec<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    cover_image: Option<Option<String>>,
}

async fn list_trips(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Trip>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(trips::list_for_owner(&state.db, user.id).await?))
}

async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateTrip>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let user = current.require_user()?;
    req.validate()?;

    let mut trip = Trip::new(user.id, req.title.trim(), req.start_date, req.end_date);
    trip.description = normalize_optional(req.description);
    trip.destinations = SqlJson(normalize_list(req.destinations));
    trip.cover_image = normalize_optional(req.cover_image);
    trip.validate()?;

    trips::insert(&state.db, &trip).await?;
    info!(trip = %trip.id, user = %user.uuid, "trip created");
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn get_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    Ok(Json(trips::get_owned(&state.db, &trip_id, user.id).await?))
}

async fn update_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(req): Json<UpdateTrip>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    req.validate()?;

    let mut trip = trips::get_owned(&state.db, &trip_id, user.id).await?;
    if let Some(title) = req.title {
        trip.title = title.trim().to_string();
    }
    if let Some(description) = req.description {
        trip.description = normalize_optional(description);
    }
    if let Some(start) = req.start_date {
        trip.start_date = start;
    }
    if let Some(end) = req.end_date {
        trip.end_date = end;
    }
    if let Some(destinations) = req.destinations {
        trip.destinations = SqlJson(normalize_list(destinations));
    }
    if let Some(cover) = req.cover_image {
        trip.cover_image = normalize_optional(cover);
    }
    trip.validate()?;
    trip.updated_at = Utc::now();

    trips::update(&state.db, &trip).await?;
    Ok(Json(trip))
}

async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    let photos = media::list_for_trip(&state.db, &trip_id, user.id).await?;
    trips::delete_owned(&state.db, &trip_id, user.id).await?;

    for photo in photos {
        if media::key_references(&state.db, &photo.storage_key).await? > 0 {
            continue;
        }
        if let Err(err) = state.storage.delete(&photo.storage_key).await {
            warn!("could not remove {} after trip delete: {err}", photo.storage_key);
        }
    }

    info!(trip = %trip_id, user = %user.uuid, "trip deleted");
    Ok(StatusCode::NO_CONTENT)
}
