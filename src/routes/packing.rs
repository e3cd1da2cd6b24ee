use axum::{
    extract::State,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::extract::{Json, Path};
use crate::{
    auth::CurrentUser,
    db::{packing, trips},
    error::AppError,
    models::packing::{ItemChanges, ItemInput, PackingItem, PackingList, PackingProgress},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/trips/:id/packinglist",
            get(get_list).put(replace_list),
        )
        .route("/trips/:id/packinglist/items", post(add_item))
        .route(
            "/trips/:id/packinglist/items/:item_id",
            patch(update_item).delete(remove_item),
        )
        .route(
            "/trips/:id/packinglist/items/:item_id/toggle",
            post(toggle_item),
        )
        .route("/trips/:id/packinglist/items/:item_id/move", post(move_item))
        .route("/trips/:id/packinglist/packed", delete(clear_packed))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PackingListView {
    pub id: String,
    pub trip_id: String,
    pub items: Vec<PackingItem>,
    pub progress: PackingProgress,
    pub updated_at: DateTime<Utc>,
}

impl From<PackingList> for PackingListView {
    fn from(list: PackingList) -> Self {
        let progress = list.progress();
        Self {
            id: list.id,
            trip_id: list.trip_id,
            items: list.items.0,
            progress,
            updated_at: list.updated_at,
        }
    }
}

async fn load(state: &AppState, trip_id: &str, owner_id: i64) -> Result<PackingList, AppError> {
    trips::get_owned(&state.db, trip_id, owner_id).await?;
    packing::load_or_empty(&state.db, trip_id, owner_id).await
}

async fn change<F>(
    state: &AppState,
    trip_id: &str,
    owner_id: i64,
    apply: F,
) -> Result<Json<PackingListView>, AppError>
where
    F: FnOnce(&mut PackingList) -> Result<(), AppError>,
{
    trips::get_owned(&state.db, trip_id, owner_id).await?;
    let list = packing::modify(&state.db, trip_id, owner_id, apply).await?;
    Ok(Json(list.into()))
}

async fn get_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<PackingListView>, AppError> {
    let user = current.require_user()?;
    Ok(Json(load(&state, &trip_id, user.id).await?.into()))
}

#[derive(Deserialize)]
struct ReplaceList {
    items: Vec<ItemInput>,
}

async fn replace_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(req): Json<ReplaceList>,
) -> Result<Json<PackingListView>, AppError> {
    let user = current.require_user()?;
    change(&state, &trip_id, user.id, |list| {
        list.replace_items(req.items)?;
        Ok(())
    })
    .await
}

#[derive(Deserialize)]
struct NewItem {
    name: String,
    category: Option<String>,
}

async fn add_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(req): Json<NewItem>,
) -> Result<Json<PackingListView>, AppError> {
    let user = current.require_user()?;
    change(&state, &trip_id, user.id, |list| {
        list.add_item(&req.name, req.category.as_deref())?;
        Ok(())
    })
    .await
}

async fn update_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, item_id)): Path<(String, String)>,
    Json(changes): Json<ItemChanges>,
) -> Result<Json<PackingListView>, AppError> {
    let user = current.require_user()?;
    change(&state, &trip_id, user.id, |list| {
        list.update_item(&item_id, changes)?;
        Ok(())
    })
    .await
}

async fn toggle_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, item_id)): Path<(String, String)>,
) -> Result<Json<PackingListView>, AppError> {
    let user = current.require_user()?;
    change(&state, &trip_id, user.id, |list| {
        list.toggle_item(&item_id)?;
        Ok(())
    })
    .await
}

async fn remove_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, item_id)): Path<(String, String)>,
) -> Result<Json<PackingListView>, AppError> {
    let user = current.require_user()?;
    change(&state, &trip_id, user.id, |list| {
        list.remove_item(&item_id)?;
        Ok(())
    })
    .await
}

#[derive(Deserialize)]
struct MoveItem {
    position: usize,
}

async fn move_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, item_id)): Path<(String, String)>,
    Json(req): Json<MoveItem>,
) -> Result<Json<PackingListView>, AppError> {
    let user = current.require_user()?;
    change(&state, &trip_id, user.id, |list| {
        list.move_item(&item_id, req.position)?;
        Ok(())
    })
    .await
}

async fn clear_packed(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<PackingListView>, AppError> {
    let user = current.require_user()?;
    change(&state, &trip_id, user.id, |list| {
        list.clear_packed();
        Ok(())
    })
    .await
}
