use axum::{extract::State, routing::get, Router};

use super::extract::Json;
use crate::{
    auth::CurrentUser,
    db::{activities, journal, media, packing, trips},
    error::AppError,
    models::stats::TravelStats,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

async fn stats(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<TravelStats>, AppError> {
    let user = current.require_user()?;
    let owned = trips::list_for_owner(&state.db, user.id).await?;

    let mut stats = TravelStats::from_trips(&owned, state.today());
    stats.journal_entries = journal::count_for_owner(&state.db, user.id).await?;
    stats.activities = activities::count_for_owner(&state.db, user.id).await?;
    stats.photos = media::count_for_owner(&state.db, user.id).await?;
    for list in packing::list_for_owner(&state.db, user.id).await? {
        let progress = list.progress();
        stats.packing.packed += progress.packed;
        stats.packing.total += progress.total;
    }

    Ok(Json(stats))
}
