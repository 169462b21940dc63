use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{Client, NewClient, UpdateClient};

pub async fn list(pool: &SqlitePool) -> Result<Vec<Client>, sqlx::Error> {
    sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY name")
        .fetch_all(pool)
        .await
}

/// The snapshot a single evaluation run works on.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Client>, sqlx::Error> {
    sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE active = 1 ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Client>, sqlx::Error> {
    sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(pool: &SqlitePool, new_client: NewClient) -> Result<Client, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Client>(
        "INSERT INTO clients (name, pattern, wildcard, failure_keyword, warning_keyword, active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(new_client.name)
    .bind(new_client.pattern)
    .bind(new_client.wildcard)
    .bind(new_client.failure_keyword)
    .bind(new_client.warning_keyword)
    .bind(new_client.active)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Applies the given fields to an existing client. Returns `None` when the
/// client does not exist.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: UpdateClient,
) -> Result<Option<Client>, sqlx::Error> {
    let Some(existing) = get(pool, id).await? else {
        return Ok(None);
    };

    let now = Utc::now();
    sqlx::query_as::<_, Client>(
        "UPDATE clients SET name = ?, pattern = ?, wildcard = ?, failure_keyword = ?, \
         warning_keyword = ?, active = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(changes.name.unwrap_or(existing.name))
    .bind(changes.pattern.unwrap_or(existing.pattern))
    .bind(changes.wildcard.unwrap_or(existing.wildcard))
    .bind(changes.failure_keyword.unwrap_or(existing.failure_keyword))
    .bind(changes.warning_keyword.unwrap_or(existing.warning_keyword))
    .bind(changes.active.unwrap_or(existing.active))
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Removes a client and its recorded history. Returns the number of deleted
/// client rows (0 when the id is unknown).
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM status_records WHERE client_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM clients WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected())
}
