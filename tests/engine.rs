use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::Notify;

use backupwatch::checks::engine::{CheckEngine, EvaluationError};
use backupwatch::db::enums::CheckStatus;
use backupwatch::db::models::NewClient;
use backupwatch::db;
use backupwatch::db::services::{client_service, status_service};
use backupwatch::mailbox::{EvaluationWindow, FetchError, MailboxFetcher, Message};

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    db::init_schema(&pool).await.expect("schema");
    pool
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
}

fn window() -> EvaluationWindow {
    EvaluationWindow {
        day: day(),
        start: Utc.with_ymd_and_hms(2026, 8, 6, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap(),
    }
}

fn message(subject: &str, hour: u32, minute: u32, body: &str) -> Message {
    Message {
        subject: subject.to_string(),
        received_at: Utc.with_ymd_and_hms(2026, 8, 6, hour, minute, 0).unwrap(),
        body: body.to_string(),
        from_address: Some("backup@example.org".to_string()),
    }
}

/// Scripted mailbox: returns the given messages, window-filtered like the
/// real reader.
struct StaticFetcher {
    messages: Vec<Message>,
}

#[async_trait]
impl MailboxFetcher for StaticFetcher {
    async fn fetch(&self, window: &EvaluationWindow) -> Result<Vec<Message>, FetchError> {
        Ok(self
            .messages
            .iter()
            .filter(|m| window.contains(m.received_at))
            .cloned()
            .collect())
    }
}

struct FailingFetcher;

#[async_trait]
impl MailboxFetcher for FailingFetcher {
    async fn fetch(&self, _window: &EvaluationWindow) -> Result<Vec<Message>, FetchError> {
        Err(FetchError::Connection("mailbox unreachable".to_string()))
    }
}

/// Parks inside fetch until released, to hold the run lock open.
struct BlockingFetcher {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl MailboxFetcher for BlockingFetcher {
    async fn fetch(&self, _window: &EvaluationWindow) -> Result<Vec<Message>, FetchError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }
}

fn engine_with(pool: SqlitePool, fetcher: impl MailboxFetcher + 'static) -> CheckEngine {
    CheckEngine::new(pool, Arc::new(fetcher))
}

#[tokio::test]
async fn clean_report_evaluates_ok() {
    let pool = test_pool().await;
    let client = client_service::create(&pool, NewClient::new("Acme", "Acme Backup Report"))
        .await
        .unwrap();

    let engine = engine_with(
        pool.clone(),
        StaticFetcher {
            messages: vec![message("Acme Backup Report - Success", 8, 0, "")],
        },
    );

    let records = engine.evaluate(&window()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, CheckStatus::Ok);
    assert_eq!(
        records[0].matched_subject.as_deref(),
        Some("Acme Backup Report - Success")
    );

    let stored = status_service::get(&pool, client.id, day()).await.unwrap().unwrap();
    assert_eq!(stored.status, CheckStatus::Ok);
}

#[tokio::test]
async fn failed_marker_wins_over_later_clean_message() {
    let pool = test_pool().await;
    let client = client_service::create(&pool, NewClient::new("Acme", "Acme Backup Report"))
        .await
        .unwrap();

    let engine = engine_with(
        pool.clone(),
        StaticFetcher {
            messages: vec![
                message("Acme Backup Report", 6, 0, "job ended [FAILED]"),
                message("Acme Backup Report - Success", 8, 0, ""),
            ],
        },
    );

    engine.evaluate(&window()).await.unwrap();

    let stored = status_service::get(&pool, client.id, day()).await.unwrap().unwrap();
    assert_eq!(stored.status, CheckStatus::Failed);
}

#[tokio::test]
async fn unmatched_client_gets_not_received() {
    let pool = test_pool().await;
    let acme = client_service::create(&pool, NewClient::new("Acme", "Acme Backup Report"))
        .await
        .unwrap();
    let globex = client_service::create(&pool, NewClient::new("Globex", "Globex Backup Report"))
        .await
        .unwrap();

    let engine = engine_with(
        pool.clone(),
        StaticFetcher {
            messages: vec![message("Acme Backup Report - Success", 8, 0, "")],
        },
    );

    engine.evaluate(&window()).await.unwrap();

    let acme_record = status_service::get(&pool, acme.id, day()).await.unwrap().unwrap();
    let globex_record = status_service::get(&pool, globex.id, day()).await.unwrap().unwrap();
    assert_eq!(acme_record.status, CheckStatus::Ok);
    assert_eq!(globex_record.status, CheckStatus::NotReceived);
    assert_eq!(globex_record.matched_subject, None);
}

#[tokio::test]
async fn window_end_is_exclusive_and_start_inclusive() {
    let pool = test_pool().await;
    let client = client_service::create(&pool, NewClient::new("Acme", "Acme Backup Report"))
        .await
        .unwrap();

    // One message exactly at the start, one exactly at the end; only the
    // first may count.
    let engine = engine_with(
        pool.clone(),
        StaticFetcher {
            messages: vec![
                message("Acme Backup Report [warning]", 0, 0, ""),
                message("Acme Backup Report - Success", 9, 0, ""),
            ],
        },
    );

    engine.evaluate(&window()).await.unwrap();

    let stored = status_service::get(&pool, client.id, day()).await.unwrap().unwrap();
    assert_eq!(stored.status, CheckStatus::Warning);
    assert_eq!(
        stored.matched_subject.as_deref(),
        Some("Acme Backup Report [warning]")
    );
}

#[tokio::test]
async fn reevaluation_is_idempotent() {
    let pool = test_pool().await;
    let client = client_service::create(&pool, NewClient::new("Acme", "Acme Backup Report"))
        .await
        .unwrap();

    let engine = engine_with(
        pool.clone(),
        StaticFetcher {
            messages: vec![message("Acme Backup Report - Success", 8, 0, "")],
        },
    );

    let first = engine.evaluate(&window()).await.unwrap();
    let second = engine.evaluate(&window()).await.unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.client_id, b.client_id);
        assert_eq!(a.day, b.day);
        assert_eq!(a.status, b.status);
        assert_eq!(a.matched_subject, b.matched_subject);
    }

    // Still exactly one row per (client, day).
    assert_eq!(status_service::count_for_day(&pool, day()).await.unwrap(), 1);
    let stored = status_service::get(&pool, client.id, day()).await.unwrap().unwrap();
    assert_eq!(stored.status, CheckStatus::Ok);
}

#[tokio::test]
async fn fetch_failure_leaves_history_unchanged() {
    let pool = test_pool().await;
    client_service::create(&pool, NewClient::new("Acme", "Acme Backup Report"))
        .await
        .unwrap();

    let good_engine = engine_with(
        pool.clone(),
        StaticFetcher {
            messages: vec![message("Acme Backup Report - Success", 8, 0, "")],
        },
    );
    good_engine.evaluate(&window()).await.unwrap();
    let before = status_service::get_for_day(&pool, day()).await.unwrap();

    let failing_engine = engine_with(pool.clone(), FailingFetcher);
    let err = failing_engine.evaluate(&window()).await.unwrap_err();
    assert!(matches!(
        err,
        EvaluationError::Fetch(FetchError::Connection(_))
    ));

    let after = status_service::get_for_day(&pool, day()).await.unwrap();
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(after.iter()) {
        assert_eq!(a.status, b.status);
        assert_eq!(a.evaluated_at, b.evaluated_at);
    }
}

#[tokio::test]
async fn concurrent_runs_for_the_same_day_are_exclusive() {
    let pool = test_pool().await;
    client_service::create(&pool, NewClient::new("Acme", "Acme Backup Report"))
        .await
        .unwrap();

    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let engine = Arc::new(engine_with(
        pool.clone(),
        BlockingFetcher {
            started: started.clone(),
            release: release.clone(),
        },
    ));

    let background = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.evaluate(&window()).await })
    };

    // Wait until the first run holds the lock inside its fetch.
    started.notified().await;

    let err = engine.evaluate(&window()).await.unwrap_err();
    assert!(matches!(err, EvaluationError::AlreadyRunning(d) if d == day()));

    release.notify_one();
    background.await.unwrap().unwrap();

    // The lock is released after the run; a fresh evaluation may proceed.
    // Store the release permit up front so the fetcher does not park again.
    release.notify_one();
    engine.evaluate(&window()).await.unwrap();
}

#[tokio::test]
async fn inactive_clients_are_not_evaluated() {
    let pool = test_pool().await;
    let inactive = client_service::create(
        &pool,
        NewClient {
            active: false,
            ..NewClient::new("Dormant", "Dormant Backup Report")
        },
    )
    .await
    .unwrap();
    client_service::create(&pool, NewClient::new("Acme", "Acme Backup Report"))
        .await
        .unwrap();

    let engine = engine_with(
        pool.clone(),
        StaticFetcher {
            messages: vec![message("Dormant Backup Report - Success", 8, 0, "")],
        },
    );

    let records = engine.evaluate(&window()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(status_service::get(&pool, inactive.id, day())
        .await
        .unwrap()
        .is_none());
}
