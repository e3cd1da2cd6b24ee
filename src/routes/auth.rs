use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extract::Json;
use crate::{
    auth::{self, AuthenticatedUser, CurrentUser},
    db::users,
    error::AppError,
    models::user::UserProfile,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/google", post(google))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

async fn session_for(state: &AppState, user: &AuthenticatedUser) -> Result<AuthResponse, AppError> {
    let stored = users::find_by_id(&state.db, user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(AuthResponse {
        token: state.tokens.issue(user)?,
        user: UserProfile::from(&stored),
    })
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = auth::register_user(&state, &req.username, &req.email, &req.password).await?;
    Ok((StatusCode::CREATED, Json(session_for(&state, &user).await?)))
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    identifier: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = auth::authenticate_user(&state, &req.identifier, &req.password).await?;
    info!(user = %user.uuid, "login");
    Ok(Json(session_for(&state, &user).await?))
}

async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<UserProfile>, AppError> {
    let user = current.require_user()?;
    let stored = users::find_by_id(&state.db, user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(UserProfile::from(&stored)))
}

#[derive(Deserialize)]
struct GoogleRequest {
    #[serde(alias = "id_token")]
    credential: String,
}

async fn google(
    State(state): State<AppState>,
    Json(req): Json<GoogleRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let verifier = state.google.as_ref().ok_or(AppError::NotImplemented)?;
    let identity = verifier.verify(&req.credential).await?;
    let user = auth::google_sign_in(&state, &identity).await?;
    Ok(Json(session_for(&state, &user).await?))
}
