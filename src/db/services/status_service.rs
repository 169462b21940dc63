use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::db::models::{StatusRecord, StatusRecordDetails};

/// Writes one run's results in a single transaction, upserting by
/// (client_id, day) so a re-evaluation overwrites the same-day records and a
/// reader never sees a half-updated day.
pub async fn record_batch(pool: &SqlitePool, records: &[StatusRecord]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for record in records {
        sqlx::query(
            "INSERT INTO status_records (client_id, day, status, matched_subject, evaluated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(client_id, day) DO UPDATE SET \
                 status = excluded.status, \
                 matched_subject = excluded.matched_subject, \
                 evaluated_at = excluded.evaluated_at",
        )
        .bind(record.client_id)
        .bind(record.day)
        .bind(record.status)
        .bind(record.matched_subject.as_deref())
        .bind(record.evaluated_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn get(
    pool: &SqlitePool,
    client_id: i64,
    day: NaiveDate,
) -> Result<Option<StatusRecord>, sqlx::Error> {
    sqlx::query_as::<_, StatusRecord>(
        "SELECT * FROM status_records WHERE client_id = ? AND day = ?",
    )
    .bind(client_id)
    .bind(day)
    .fetch_optional(pool)
    .await
}

/// One row per client evaluated on the given day, joined with client names.
pub async fn get_for_day(
    pool: &SqlitePool,
    day: NaiveDate,
) -> Result<Vec<StatusRecordDetails>, sqlx::Error> {
    sqlx::query_as::<_, StatusRecordDetails>(
        "SELECT r.client_id, c.name AS client_name, r.day, r.status, r.matched_subject, r.evaluated_at \
         FROM status_records r JOIN clients c ON c.id = r.client_id \
         WHERE r.day = ? ORDER BY c.name",
    )
    .bind(day)
    .fetch_all(pool)
    .await
}

pub async fn latest(
    pool: &SqlitePool,
    client_id: i64,
) -> Result<Option<StatusRecordDetails>, sqlx::Error> {
    sqlx::query_as::<_, StatusRecordDetails>(
        "SELECT r.client_id, c.name AS client_name, r.day, r.status, r.matched_subject, r.evaluated_at \
         FROM status_records r JOIN clients c ON c.id = r.client_id \
         WHERE r.client_id = ? ORDER BY r.day DESC LIMIT 1",
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await
}

/// How many records exist for the day; used to tell "never evaluated" from
/// "evaluated with no clients".
pub async fn count_for_day(pool: &SqlitePool, day: NaiveDate) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM status_records WHERE day = ?")
            .bind(day)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
