pub mod activities;
pub mod auth;
pub mod extract;
pub mod journal;
pub mod media;
pub mod packing;
pub mod stats;
pub mod trips;

use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{services::storage::PUBLIC_PREFIX, state::AppState};

pub const API_PREFIX: &str = "/api/v1";

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .merge(trips::router())
        .merge(journal::router())
        .merge(packing::router())
        .merge(activities::router())
        .merge(media::router(state.config.max_upload_bytes))
        .merge(stats::router());

    Router::new()
        .nest(API_PREFIX, api)
        .nest_service(
            &format!("/{PUBLIC_PREFIX}"),
            ServeDir::new(state.storage.root()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Trims optional text input, mapping blank strings to `None`.
pub(crate) fn normalize_optional(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Trims list input and drops blank entries.
pub(crate) fn normalize_list(input: Vec<String>) -> Vec<String> {
    input
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
