use super::DbPool;
use crate::{error::AppError, models::media::Media};

const MEDIA_COLUMNS: &str =
    "id, owner_id, trip_id, storage_key, url, content_type, size_bytes, caption, uploaded_at";

pub async fn insert(db: &DbPool, media: &Media) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO media (id, owner_id, trip_id, storage_key, url, content_type, size_bytes,
               caption, uploaded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
    )
    .bind(&media.id)
    .bind(media.owner_id)
    .bind(&media.trip_id)
    .bind(&media.storage_key)
    .bind(&media.url)
    .bind(&media.content_type)
    .bind(media.size_bytes)
    .bind(&media.caption)
    .bind(media.uploaded_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn list_for_trip(db: &DbPool, trip_id: &str, owner_id: i64) -> Result<Vec<Media>, AppError> {
    let sql = format!(
        "SELECT {MEDIA_COLUMNS} FROM media WHERE trip_id = ?1 AND owner_id = ?2 \
         ORDER BY uploaded_at DESC"
    );
    Ok(sqlx::query_as::<_, Media>(&sql)
        .bind(trip_id)
        .bind(owner_id)
        .fetch_all(db)
        .await?)
}

pub async fn get_owned(db: &DbPool, id: &str, owner_id: i64) -> Result<Media, AppError> {
    let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = ?1 AND owner_id = ?2");
    sqlx::query_as::<_, Media>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn delete_owned(db: &DbPool, id: &str, owner_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM media WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Number of media rows still pointing at `storage_key`.
pub async fn key_references(db: &DbPool, storage_key: &str) -> Result<i64, AppError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM media WHERE storage_key = ?1")
            .bind(storage_key)
            .fetch_one(db)
            .await?,
    )
}

pub async fn count_for_owner(db: &DbPool, owner_id: i64) -> Result<i64, AppError> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM media WHERE owner_id = ?1")
        .bind(owner_id)
        .fetch_one(db)
        .await?)
}
