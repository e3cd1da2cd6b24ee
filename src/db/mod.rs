pub mod activities;
pub mod journal;
pub mod media;
pub mod packing;
pub mod trips;
pub mod users;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::AppError;

pub type DbPool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<DbPool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Maps a unique-constraint violation to a conflict, leaving other errors as-is.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}
