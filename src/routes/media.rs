use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::{
    extract::{Json, Path},
    normalize_optional,
};
use crate::{
    auth::CurrentUser,
    db::{media, trips},
    error::AppError,
    models::media::{Media, StoredObject},
    services::storage::content_type_for_key,
    state::AppState,
};

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/media/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/media/confirm", post(confirm))
        .route("/media/:id", delete(delete_media))
        .route("/trips/:id/photos", get(list_photos))
}

async fn upload(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<StoredObject>), AppError> {
    let user = current.require_user()?;
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("file part has no content type".into()))?;
        let data = field.bytes().await?;

        let stored = state.storage.store(&user.uuid, &content_type, &data).await?;
        info!(user = %user.uuid, key = %stored.storage_key, "upload stored");
        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(AppError::BadRequest("multipart field \"file\" is missing".into()))
}

#[derive(Debug, Deserialize, Validate)]
struct ConfirmUpload {
    trip_id: String,
    storage_key: String,
    #[validate(length(max = 500))]
    caption: Option<String>,
    #[serde(default)]
    set_as_cover: bool,
}

async fn confirm(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ConfirmUpload>,
) -> Result<(StatusCode, Json<Media>), AppError> {
    let user = current.require_user()?;
    req.validate()?;
    let mut trip = trips::get_owned(&state.db, &req.trip_id, user.id).await?;

    if !state.storage.owns(&user.uuid, &req.storage_key)
        || !state.storage.exists(&req.storage_key).await?
    {
        return Err(AppError::NotFound);
    }

    let size = state.storage.size_of(&req.storage_key).await?;
    let record = Media {
        id: Uuid::new_v4().to_string(),
        owner_id: user.id,
        trip_id: trip.id.clone(),
        url: state.storage.url_for(&req.storage_key)?,
        content_type: content_type_for_key(&req.storage_key),
        size_bytes: i64::try_from(size).unwrap_or(i64::MAX),
        storage_key: req.storage_key,
        caption: normalize_optional(req.caption),
        uploaded_at: Utc::now(),
    };
    media::insert(&state.db, &record).await?;

    if req.set_as_cover {
        trip.cover_image = Some(record.url.clone());
        trip.updated_at = Utc::now();
        trips::update(&state.db, &trip).await?;
    }

    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_photos(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<Media>>, AppError> {
    let user = current.require_user()?;
    trips::get_owned(&state.db, &trip_id, user.id).await?;
    Ok(Json(media::list_for_trip(&state.db, &trip_id, user.id).await?))
}

async fn delete_media(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(media_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    let record = media::get_owned(&state.db, &media_id, user.id).await?;
    media::delete_owned(&state.db, &record.id, user.id).await?;

    if let Some(mut trip) = trips::find_owned(&state.db, &record.trip_id, user.id).await? {
        if trip.cover_image.as_deref() == Some(record.url.as_str()) {
            trip.cover_image = None;
            trip.updated_at = Utc::now();
            trips::update(&state.db, &trip).await?;
        }
    }

    if media::key_references(&state.db, &record.storage_key).await? == 0 {
        if let Err(err) = state.storage.delete(&record.storage_key).await {
            warn!("could not remove {}: {err}", record.storage_key);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
