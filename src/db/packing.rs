use super::DbPool;
use crate::{error::AppError, models::packing::PackingList};

/// Returns the trip's list, or a fresh unsaved one when none exists yet.
pub async fn load_or_empty(
    db: &DbPool,
    trip_id: &str,
    owner_id: i64,
) -> Result<PackingList, AppError> {
    let found = sqlx::query_as::<_, PackingList>(
        "SELECT id, trip_id, owner_id, items, updated_at FROM packing_lists
         WHERE trip_id = ?1 AND owner_id = ?2",
    )
    .bind(trip_id)
    .bind(owner_id)
    .fetch_optional(db)
    .await?;
    Ok(found.unwrap_or_else(|| PackingList::empty(trip_id, owner_id)))
}

/// Applies `change` to the trip's list as one read-modify-write.
///
/// The transaction opens with a write, so SQLite hands out its write lock
/// before the list is read and concurrent changes queue up behind each other
/// instead of overwriting one another. Nothing is stored when `change` fails.
pub async fn modify<F>(
    db: &DbPool,
    trip_id: &str,
    owner_id: i64,
    change: F,
) -> Result<PackingList, AppError>
where
    F: FnOnce(&mut PackingList) -> Result<(), AppError>,
{
    let mut tx = db.begin().await?;

    let fresh = PackingList::empty(trip_id, owner_id);
    sqlx::query(
        r#"INSERT INTO packing_lists (id, trip_id, owner_id, items, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(trip_id) DO NOTHING"#,
    )
    .bind(&fresh.id)
    .bind(&fresh.trip_id)
    .bind(fresh.owner_id)
    .bind(&fresh.items)
    .bind(fresh.updated_at)
    .execute(&mut *tx)
    .await?;

    let mut list = sqlx::query_as::<_, PackingList>(
        "SELECT id, trip_id, owner_id, items, updated_at FROM packing_lists
         WHERE trip_id = ?1 AND owner_id = ?2",
    )
    .bind(trip_id)
    .bind(owner_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound)?;

    change(&mut list)?;

    sqlx::query("UPDATE packing_lists SET items = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(&list.items)
        .bind(list.updated_at)
        .bind(&list.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(list)
}

pub async fn list_for_owner(db: &DbPool, owner_id: i64) -> Result<Vec<PackingList>, AppError> {
    Ok(sqlx::query_as::<_, PackingList>(
        "SELECT id, trip_id, owner_id, items, updated_at FROM packing_lists WHERE owner_id = ?1",
    )
    .bind(owner_id)
    .fetch_all(db)
    .await?)
}
