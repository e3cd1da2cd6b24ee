use super::DbPool;
use crate::{error::AppError, models::trip::Trip};

const TRIP_COLUMNS: &str = "id, owner_id, title, description, start_date, end_date, destinations, \
     cover_image, created_at, updated_at";

pub async fn insert(db: &DbPool, trip: &Trip) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO trips (id, owner_id, title, description, start_date, end_date,
               destinations, cover_image, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
    )
    .bind(&trip.id)
    .bind(trip.owner_id)
    .bind(&trip.title)
    .bind(&trip.description)
    .bind(trip.start_date)
    .bind(trip.end_date)
    .bind(&trip.destinations)
    .bind(&trip.cover_image)
    .bind(trip.created_at)
    .bind(trip.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn list_for_owner(db: &DbPool, owner_id: i64) -> Result<Vec<Trip>, AppError> {
    let sql = format!(
        "SELECT {TRIP_COLUMNS} FROM trips WHERE owner_id = ?1 ORDER BY start_date DESC, created_at DESC"
    );
    Ok(sqlx::query_as::<_, Trip>(&sql)
        .bind(owner_id)
        .fetch_all(db)
        .await?)
}

/// Fetches a trip only if it belongs to `owner_id`.
pub async fn find_owned(db: &DbPool, id: &str, owner_id: i64) -> Result<Option<Trip>, AppError> {
    let sql = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1 AND owner_id = ?2");
    Ok(sqlx::query_as::<_, Trip>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?)
}

pub async fn get_owned(db: &DbPool, id: &str, owner_id: i64) -> Result<Trip, AppError> {
    find_owned(db, id, owner_id).await?.ok_or(AppError::NotFound)
}

pub async fn update(db: &DbPool, trip: &Trip) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"UPDATE trips SET title = ?1, description = ?2, start_date = ?3, end_date = ?4,
               destinations = ?5, cover_image = ?6, updated_at = ?7
           WHERE id = ?8 AND owner_id = ?9"#,
    )
    .bind(&trip.title)
    .bind(&trip.description)
    .bind(trip.start_date)
    .bind(trip.end_date)
    .bind(&trip.destinations)
    .bind(&trip.cover_image)
    .bind(trip.updated_at)
    .bind(&trip.id)
    .bind(trip.owner_id)
    .execute(db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn delete_owned(db: &DbPool, id: &str, owner_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM trips WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
