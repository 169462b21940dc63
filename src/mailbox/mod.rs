use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

pub mod imap_fetcher;

pub use imap_fetcher::ImapFetcher;

#[derive(Error, Debug)]
pub enum FetchError {
    /// Mailbox unreachable, TLS failure, rejected credentials, or a lost
    /// connection.
    #[error("mailbox connection failed: {0}")]
    Connection(String),
    /// The server answered, but with a malformed or unexpected response.
    #[error("mailbox protocol error: {0}")]
    Protocol(String),
}

/// A message as seen by the matching engine. Fetched per run, never persisted.
#[derive(Debug, Clone)]
pub struct Message {
    pub subject: String,
    pub received_at: DateTime<Utc>,
    pub body: String,
    pub from_address: Option<String>,
}

/// The acceptance interval for one day's expected mail,
/// start-inclusive and end-exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationWindow {
    pub day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EvaluationWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Capability interface over the mailbox. The production implementation talks
/// IMAP; tests substitute a scripted double. A fetch is a fully materialized
/// snapshot of the window and can be reissued after a failure.
#[async_trait]
pub trait MailboxFetcher: Send + Sync {
    async fn fetch(&self, window: &EvaluationWindow) -> Result<Vec<Message>, FetchError>;
}
