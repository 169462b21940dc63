use serde::{Deserialize, Serialize};
use std::fmt;

/// Daily delivery status for one client. Stored as text in `status_records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Ok,
    Warning,
    Failed,
    NotReceived,
}

impl CheckStatus {
    /// Severity ordering used to aggregate multiple matches for one day:
    /// FAILED > WARNING > OK. NOT_RECEIVED never appears in a match set.
    pub fn severity_rank(self) -> u8 {
        match self {
            CheckStatus::NotReceived => 0,
            CheckStatus::Ok => 1,
            CheckStatus::Warning => 2,
            CheckStatus::Failed => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Ok => "OK",
            CheckStatus::Warning => "WARNING",
            CheckStatus::Failed => "FAILED",
            CheckStatus::NotReceived => "NOT_RECEIVED",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(CheckStatus::Failed.severity_rank() > CheckStatus::Warning.severity_rank());
        assert!(CheckStatus::Warning.severity_rank() > CheckStatus::Ok.severity_rank());
    }
}
