use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use super::matcher;
use crate::db::enums::CheckStatus;
use crate::db::models::{Client, StatusRecord};
use crate::db::services::{client_service, status_service};
use crate::mailbox::{EvaluationWindow, FetchError, MailboxFetcher, Message};

#[derive(Error, Debug)]
pub enum EvaluationError {
    /// The mailbox could not be read; no per-client conclusion can be drawn,
    /// so the run aborts before any record is written.
    #[error("evaluation failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("an evaluation for {0} is already running")]
    AlreadyRunning(NaiveDate),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Evaluates one day's mailbox snapshot against all active clients and writes
/// the resulting status records. Holds a per-day run lock so the scheduled
/// and manual triggers cannot interleave writes for the same day.
pub struct CheckEngine {
    pool: SqlitePool,
    fetcher: Arc<dyn MailboxFetcher>,
    run_locks: DashMap<NaiveDate, ()>,
}

impl CheckEngine {
    pub fn new(pool: SqlitePool, fetcher: Arc<dyn MailboxFetcher>) -> Self {
        Self {
            pool,
            fetcher,
            run_locks: DashMap::new(),
        }
    }

    pub async fn evaluate(
        &self,
        window: &EvaluationWindow,
    ) -> Result<Vec<StatusRecord>, EvaluationError> {
        let _guard = self.acquire_run_lock(window.day)?;

        let clients = client_service::list_active(&self.pool).await?;
        if clients.is_empty() {
            info!(day = %window.day, "no active clients, nothing to evaluate");
            return Ok(Vec::new());
        }

        // One fetch shared across all clients.
        let messages = self.fetcher.fetch(window).await?;
        info!(
            day = %window.day,
            message_count = messages.len(),
            client_count = clients.len(),
            "evaluating mailbox snapshot"
        );

        let records = evaluate_clients(&clients, &messages, window.day, Utc::now());
        status_service::record_batch(&self.pool, &records).await?;

        let missing = records
            .iter()
            .filter(|r| r.status == CheckStatus::NotReceived)
            .count();
        info!(
            day = %window.day,
            recorded = records.len(),
            not_received = missing,
            "evaluation recorded"
        );

        Ok(records)
    }

    fn acquire_run_lock(&self, day: NaiveDate) -> Result<RunGuard<'_>, EvaluationError> {
        match self.run_locks.entry(day) {
            Entry::Occupied(_) => Err(EvaluationError::AlreadyRunning(day)),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(RunGuard {
                    locks: &self.run_locks,
                    day,
                })
            }
        }
    }
}

/// Released on drop, so the lock also clears when a run errors out.
struct RunGuard<'a> {
    locks: &'a DashMap<NaiveDate, ()>,
    day: NaiveDate,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.locks.remove(&self.day);
    }
}

/// The state-transition core: one record per client, no I/O. The worst
/// severity among a client's matches decides the status; the newest match is
/// the subject shown to the dashboard.
pub fn evaluate_clients(
    clients: &[Client],
    messages: &[Message],
    day: NaiveDate,
    evaluated_at: DateTime<Utc>,
) -> Vec<StatusRecord> {
    clients
        .iter()
        .map(|client| {
            let matches: Vec<_> = messages
                .iter()
                .filter_map(|message| matcher::classify(message, client))
                .collect();

            let (status, matched_subject) = if matches.is_empty() {
                (CheckStatus::NotReceived, None)
            } else {
                let status = matches
                    .iter()
                    .map(|m| m.severity)
                    .max_by_key(|s| s.severity_rank())
                    .unwrap_or(CheckStatus::Ok);
                let matched_subject = matches
                    .iter()
                    .max_by_key(|m| m.message.received_at)
                    .map(|m| m.message.subject.clone());
                (status, matched_subject)
            };

            StatusRecord {
                client_id: client.id,
                day,
                status,
                matched_subject,
                evaluated_at,
            }
        })
        .collect()
}
