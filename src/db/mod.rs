use sqlx::SqlitePool;

pub mod enums;
pub mod models;
pub mod services;

const SCHEMA: &str = include_str!("schema.sql");

/// Creates the tables on a fresh database; a no-op when they already exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
