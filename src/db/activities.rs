use super::DbPool;
use crate::{error::AppError, models::activity::Activity};

const ACTIVITY_COLUMNS: &str =
    "id, trip_id, owner_id, title, kind, starts_at, location, description, created_at";

pub async fn insert(db: &DbPool, activity: &Activity) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO activities (id, trip_id, owner_id, title, kind, starts_at, location,
               description, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
    )
    .bind(&activity.id)
    .bind(&activity.trip_id)
    .bind(activity.owner_id)
    .bind(&activity.title)
    .bind(activity.kind)
    .bind(activity.starts_at)
    .bind(&activity.location)
    .bind(&activity.description)
    .bind(activity.created_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn list_for_trip(
    db: &DbPool,
    trip_id: &str,
    owner_id: i64,
) -> Result<Vec<Activity>, AppError> {
    let sql = format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE trip_id = ?1 AND owner_id = ?2 \
         ORDER BY starts_at ASC"
    );
    Ok(sqlx::query_as::<_, Activity>(&sql)
        .bind(trip_id)
        .bind(owner_id)
        .fetch_all(db)
        .await?)
}

pub async fn get_owned(db: &DbPool, id: &str, owner_id: i64) -> Result<Activity, AppError> {
    let sql = format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1 AND owner_id = ?2");
    sqlx::query_as::<_, Activity>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn update(db: &DbPool, activity: &Activity) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"UPDATE activities SET title = ?1, kind = ?2, starts_at = ?3, location = ?4,
               description = ?5
           WHERE id = ?6 AND owner_id = ?7"#,
    )
    .bind(&activity.title)
    .bind(activity.kind)
    .bind(activity.starts_at)
    .bind(&activity.location)
    .bind(&activity.description)
    .bind(&activity.id)
    .bind(activity.owner_id)
    .execute(db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn delete_owned(db: &DbPool, id: &str, owner_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM activities WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn count_for_owner(db: &DbPool, owner_id: i64) -> Result<i64, AppError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM activities WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(db)
            .await?,
    )
}
