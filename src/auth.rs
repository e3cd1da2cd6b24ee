use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    db::users,
    error::AppError,
    models::user::User,
    services::google::GoogleIdentity,
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub uuid: String,
    pub username: String,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid.clone(),
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User uuid.
    pub sub: String,
    pub uid: i64,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret)),
            decoding: Arc::new(DecodingKey::from_secret(secret)),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &AuthenticatedUser) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.uuid.clone(),
            uid: user.id,
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            debug!("rejected bearer token: {err}");
            AppError::Unauthorized
        })?;
        Ok(AuthenticatedUser {
            id: data.claims.uid,
            uuid: data.claims.sub,
            username: data.claims.username,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(Self(Some(user.clone())));
        }

        let header =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await;
        let Ok(TypedHeader(Authorization(bearer))) = header else {
            // A malformed header is treated the same as a bad token.
            if parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
                return Err(AppError::Unauthorized);
            }
            return Ok(Self(None));
        };

        let app = AppState::from_ref(state);
        let user = app.tokens.verify(bearer.token())?;
        parts.extensions.insert(user.clone());
        Ok(Self(Some(user)))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Other(anyhow::anyhow!("password hashing failed: {err}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!("stored password hash is unreadable: {err}");
            false
        }
    }
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(AppError::Validation(
            "username must be between 3 and 32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AppError::Validation(
            "username may only contain letters, digits, '_', '.' and '-'".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(' ')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("email address is invalid".into()))
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub async fn register_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let username = username.trim();
    let email = email.trim().to_lowercase();
    validate_username(username)?;
    validate_email(&email)?;
    validate_password(password)?;

    if users::username_exists(&state.db, username).await? {
        return Err(AppError::Conflict("username already taken".into()));
    }
    if users::email_exists(&state.db, &email).await? {
        return Err(AppError::Conflict("email already registered".into()));
    }

    let hash = hash_password(password)?;
    let user = users::create_user(&state.db, username, &email, Some(&hash), None).await?;
    info!(user = %user.uuid, "registered new user");
    Ok(AuthenticatedUser::from(&user))
}

pub async fn authenticate_user(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let identifier = identifier.trim();
    if identifier.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "identifier and password are required".into(),
        ));
    }

    let user = users::find_by_identifier(&state.db, identifier)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(AppError::Unauthorized);
    };
    if !verify_password(password, hash) {
        return Err(AppError::Unauthorized);
    }

    users::touch_last_login(&state.db, user.id).await?;
    Ok(AuthenticatedUser::from(&user))
}

/// Resolves a verified Google identity to a local user: by subject first,
/// then by email (linking the account), otherwise a new user.
pub async fn google_sign_in(
    state: &AppState,
    identity: &GoogleIdentity,
) -> Result<AuthenticatedUser, AppError> {
    if let Some(user) = users::find_by_google_sub(&state.db, &identity.subject).await? {
        users::touch_last_login(&state.db, user.id).await?;
        return Ok(AuthenticatedUser::from(&user));
    }

    if let Some(user) = users::find_by_email(&state.db, &identity.email).await? {
        users::link_google(&state.db, user.id, &identity.subject).await?;
        users::touch_last_login(&state.db, user.id).await?;
        info!(user = %user.uuid, "linked google account");
        return Ok(AuthenticatedUser::from(&user));
    }

    let username = unique_username(state, &identity.email).await?;
    let user = users::create_user(
        &state.db,
        &username,
        &identity.email,
        None,
        Some(&identity.subject),
    )
    .await?;
    users::touch_last_login(&state.db, user.id).await?;
    info!(user = %user.uuid, "registered user via google");
    Ok(AuthenticatedUser::from(&user))
}

async fn unique_username(state: &AppState, email: &str) -> Result<String, AppError> {
    let base = username_base(email);
    if !users::username_exists(&state.db, &base).await? {
        return Ok(base);
    }
    for suffix in 2..1000 {
        let candidate = format!("{base}{suffix}");
        if !users::username_exists(&state.db, &candidate).await? {
            return Ok(candidate);
        }
    }
    Err(AppError::Conflict("could not derive a free username".into()))
}

/// Username stem derived from the local part of an email address.
pub fn username_base(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut base: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .take(28)
        .collect();
    while base.chars().count() < 3 {
        base.push('_');
    }
    base
}
