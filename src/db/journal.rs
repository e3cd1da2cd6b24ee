use super::DbPool;
use crate::{error::AppError, models::journal::JournalEntry};

const ENTRY_COLUMNS: &str = "id, trip_id, owner_id, title, content, location, media, entry_date, \
     created_at, updated_at";

pub async fn insert(db: &DbPool, entry: &JournalEntry) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO journal_entries (id, trip_id, owner_id, title, content, location, media,
               entry_date, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
    )
    .bind(&entry.id)
    .bind(&entry.trip_id)
    .bind(entry.owner_id)
    .bind(&entry.title)
    .bind(&entry.content)
    .bind(&entry.location)
    .bind(&entry.media)
    .bind(entry.entry_date)
    .bind(entry.created_at)
    .bind(entry.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn list_for_trip(
    db: &DbPool,
    trip_id: &str,
    owner_id: i64,
) -> Result<Vec<JournalEntry>, AppError> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE trip_id = ?1 AND owner_id = ?2 \
         ORDER BY entry_date DESC"
    );
    Ok(sqlx::query_as::<_, JournalEntry>(&sql)
        .bind(trip_id)
        .bind(owner_id)
        .fetch_all(db)
        .await?)
}

pub async fn get_owned(db: &DbPool, id: &str, owner_id: i64) -> Result<JournalEntry, AppError> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = ?1 AND owner_id = ?2");
    sqlx::query_as::<_, JournalEntry>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn update(db: &DbPool, entry: &JournalEntry) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"UPDATE journal_entries SET title = ?1, content = ?2, location = ?3, media = ?4,
               entry_date = ?5, updated_at = ?6
           WHERE id = ?7 AND owner_id = ?8"#,
    )
    .bind(&entry.title)
    .bind(&entry.content)
    .bind(&entry.location)
    .bind(&entry.media)
    .bind(entry.entry_date)
    .bind(entry.updated_at)
    .bind(&entry.id)
    .bind(entry.owner_id)
    .execute(db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn delete_owned(db: &DbPool, id: &str, owner_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM journal_entries WHERE id = ?1 AND owner_id = ?2")
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
        sqlx::query_scalar("SELECT COUNT(*) FROM journal_entries WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(db)
            .await?,
    )
}
