use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::enums::CheckStatus;

/// A registered client whose daily backup report mail is expected.
/// Corresponds to the `clients` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    /// Expected subject pattern: case-insensitive substring, or ordered `*`
    /// fragments when `wildcard` is set.
    pub pattern: String,
    pub wildcard: bool,
    pub failure_keyword: String,
    pub warning_keyword: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new client; keywords fall back to the subject markers
/// the backup product puts in its report mails.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub pattern: String,
    pub wildcard: bool,
    pub failure_keyword: String,
    pub warning_keyword: String,
    pub active: bool,
}

impl NewClient {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            wildcard: false,
            failure_keyword: "[failed]".to_string(),
            warning_keyword: "[warning]".to_string(),
            active: true,
        }
    }
}

/// Partial update for an existing client; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub wildcard: Option<bool>,
    pub failure_keyword: Option<String>,
    pub warning_keyword: Option<String>,
    pub active: Option<bool>,
}

/// One delivery status per (client, day).
/// Corresponds to the `status_records` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StatusRecord {
    pub client_id: i64,
    pub day: NaiveDate,
    pub status: CheckStatus,
    pub matched_subject: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

/// Status record joined with the client name, for the read surface.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusRecordDetails {
    pub client_id: i64,
    pub client_name: String,
    pub day: NaiveDate,
    pub status: CheckStatus,
    pub matched_subject: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}
