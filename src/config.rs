use std::{env, net::SocketAddr, path::PathBuf};

use chrono_tz::Tz;
use url::Url;

use crate::error::AppError;

const DEV_JWT_SECRET: &str = "journeystack-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub media_root: PathBuf,
    pub public_base_url: Url,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub timezone: Tz,
    pub max_upload_bytes: usize,
    pub google_client_id: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://journeystack.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let media_root = env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let public_base_url = parse_base_url(
            &env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{listen_addr}/")),
        )?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, falling back to the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let jwt_ttl_hours = parse_positive("JWT_TTL_HOURS", env::var("JWT_TTL_HOURS").ok(), 168)?;
        let max_upload_bytes = parse_positive(
            "MAX_UPLOAD_BYTES",
            env::var("MAX_UPLOAD_BYTES").ok(),
            10 * 1024 * 1024,
        )?;

        let timezone = parse_timezone(&env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".into()))?;

        let google_client_id = env::var("GOOGLE_CLIENT_ID")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_url,
            listen_addr,
            media_root,
            public_base_url,
            jwt_secret,
            jwt_ttl_hours,
            timezone,
            max_upload_bytes,
            google_client_id,
        })
    }
}

pub fn parse_timezone(raw: &str) -> Result<Tz, AppError> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|err| AppError::Config(format!("invalid timezone {raw:?}: {err}")))
}

/// Public URLs are built with `Url::join`, which drops the last path segment
/// unless the base ends in a slash.
pub fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized)
        .map_err(|err| AppError::Config(format!("invalid PUBLIC_BASE_URL: {err}")))
}

fn parse_positive<T>(name: &str, raw: Option<String>, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: T = raw
        .trim()
        .parse()
        .map_err(|err| AppError::Config(format!("invalid {name}: {err}")))?;
    if value <= T::default() {
        return Err(AppError::Config(format!("{name} must be positive")));
    }
    Ok(value)
}
