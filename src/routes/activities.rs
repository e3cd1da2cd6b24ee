use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use super::{
    extract::{Json, Path, Query},
    normalize_optional,
};
use crate::{
    auth::CurrentUser,
    config::parse_timezone,
    db::{activities, trips},
    error::AppError,
    itinerary::{build_itinerary, local_date, Itinerary},
    models::{
        activity::{Activity, ActivityKind},
        trip::Trip,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/trips/:id/activities",
            get(list_activities).post(create_activity),
        )
        .route("/trips/:id/itinerary", get(itinerary))
        .route(
            "/activities/:id",
            put(update_activity).delete(delete_activity),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct CreateActivity {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[serde(default, alias = "type")]
    kind: ActivityKind,
    starts_at: DateTime<Utc>,
    location: Option<String>,
    #[validate(length(max = 5000))]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
struct UpdateActivity {
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
    #[serde(alias = "type")]
    kind: Option<ActivityKind>,
    starts_at: Option<DateTime<Utc>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    location: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    description: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct ItineraryQuery {
    tz: Option<String>,
}

/// Activities must fall on one of the trip's local calendar days.
fn ensure_within_trip(state: &AppState, trip: &Trip, activity: &Activity) -> Result<(), AppError> {
    let day = local_date(activity, &state.config.timezone);
    if !trip.contains(day) {
        return Err(AppError::Validation(format!(
            "activity on {day} is outside the trip ({} to {})",
            trip.start_date, trip.end_date
        )));
    }
    Ok(())
}

async fn list_activities(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<Activity>>, AppError> {
    let user = current.require_user()?;
    trips::get_owned(&state.db, &trip_id, user.id).await?;
    Ok(Json(
        activities::list_for_trip(&state.db, &trip_id, user.id).await?,
    ))
}

async fn create_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(req): Json<CreateActivity>,
) -> Result<(StatusCode, Json<Activity>), AppError> {
    let user = current.require_user()?;
    req.validate()?;
    let trip = trips::get_owned(&state.db, &trip_id, user.id).await?;

    let mut activity = Activity::new(
        trip.id.clone(),
        user.id,
        req.title.trim(),
        req.kind,
        req.starts_at,
    );
    activity.location = normalize_optional(req.location);
    activity.description = normalize_optional(req.description);
    ensure_within_trip(&state, &trip, &activity)?;

    activities::insert(&state.db, &activity).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn update_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(activity_id): Path<String>,
    Json(req): Json<UpdateActivity>,
) -> Result<Json<Activity>, AppError> {
    let user = current.require_user()?;
    req.validate()?;

    let mut activity = activities::get_owned(&state.db, &activity_id, user.id).await?;
    if let Some(title) = req.title {
        activity.title = title.trim().to_string();
    }
    if let Some(kind) = req.kind {
        activity.kind = kind;
    }
    if let Some(starts_at) = req.starts_at {
        activity.starts_at = starts_at;
    }
    if let Some(location) = req.location {
        activity.location = normalize_optional(location);
    }
    if let Some(description) = req.description {
        activity.description = normalize_optional(description);
    }

    let trip = trips::get_owned(&state.db, &activity.trip_id, user.id).await?;
    ensure_within_trip(&state, &trip, &activity)?;

    activities::update(&state.db, &activity).await?;
    Ok(Json(activity))
}

async fn delete_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(activity_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    activities::delete_owned(&state.db, &activity_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn itinerary(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Query(query): Query<ItineraryQuery>,
) -> Result<Json<Itinerary>, AppError> {
    let user = current.require_user()?;
    let tz = match query.tz.as_deref().filter(|tz| !tz.trim().is_empty()) {
        Some(raw) => parse_timezone(raw)
            .map_err(|_| AppError::BadRequest(format!("unknown timezone {raw:?}")))?,
        None => state.config.timezone,
    };

    let trip = trips::get_owned(&state.db, &trip_id, user.id).await?;
    let items = activities::list_for_trip(&state.db, &trip_id, user.id).await?;
    let mut plan = build_itinerary(trip.start_date, trip.end_date, items, &tz);
    plan.timezone = tz.name().to_string();
    Ok(Json(plan))
}
