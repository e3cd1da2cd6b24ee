use chrono::Utc;
use uuid::Uuid;

use super::{conflict_on_unique, DbPool};
use crate::{error::AppError, models::user::User};

const USER_COLUMNS: &str =
    "id, uuid, username, email, password_hash, google_sub, created_at, last_login_at";

pub async fn create_user(
    db: &DbPool,
    username: &str,
    email: &str,
    password_hash: Option<&str>,
    google_sub: Option<&str>,
) -> Result<User, AppError> {
    let sql = format!(
        "INSERT INTO users (uuid, username, email, password_hash, google_sub, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(google_sub)
        .bind(Utc::now())
        .fetch_one(db)
        .await
        .map_err(|err| conflict_on_unique(err, "username or email already taken"))
}

pub async fn find_by_id(db: &DbPool, id: i64) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?)
}

/// Looks a user up by username, or by email ignoring case.
pub async fn find_by_identifier(db: &DbPool, identifier: &str) -> Result<Option<User>, AppError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 OR lower(email) = lower(?1) LIMIT 1"
    );
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(identifier)
        .fetch_optional(db)
        .await?)
}

pub async fn find_by_google_sub(db: &DbPool, subject: &str) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE google_sub = ?1");
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(subject)
        .fetch_optional(db)
        .await?)
}

pub async fn find_by_email(db: &DbPool, email: &str) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?1)");
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(db)
        .await?)
}

pub async fn username_exists(db: &DbPool, username: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1")
        .bind(username)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

pub async fn email_exists(db: &DbPool, email: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE lower(email) = lower(?1)")
        .bind(email)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

pub async fn link_google(db: &DbPool, id: i64, subject: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET google_sub = ?1 WHERE id = ?2")
        .bind(subject)
        .bind(id)
        .execute(db)
        .await
        .map_err(|err| conflict_on_unique(err, "google account already linked"))?;
    Ok(())
}

pub async fn touch_last_login(db: &DbPool, id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET last_login_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
