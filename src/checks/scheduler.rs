use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{error, info, warn};

use super::engine::EvaluationError;
use crate::config::ScheduleConfig;
use crate::db::models::StatusRecordDetails;
use crate::db::services::status_service;
use crate::mailbox::EvaluationWindow;
use crate::web::AppState;

/// The day's acceptance interval, local times widened to UTC instants.
pub fn window_for_day(day: NaiveDate, schedule: &ScheduleConfig) -> EvaluationWindow {
    EvaluationWindow {
        day,
        start: local_to_utc(day.and_time(schedule.window_start), schedule.utc_offset),
        end: local_to_utc(day.and_time(schedule.evaluation_time), schedule.utc_offset),
    }
}

/// The calendar day at `now` in the configured offset.
pub fn local_day(now: DateTime<Utc>, schedule: &ScheduleConfig) -> NaiveDate {
    now.with_timezone(&schedule.utc_offset).date_naive()
}

/// Next occurrence of the evaluation time-of-day, strictly after `now`.
pub fn next_run_instant(schedule: &ScheduleConfig, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_now = now.with_timezone(&schedule.utc_offset);
    let mut day = local_now.date_naive();
    let mut candidate = local_to_utc(day.and_time(schedule.evaluation_time), schedule.utc_offset);
    if candidate <= now {
        day = day.succ_opt().unwrap_or(day);
        candidate = local_to_utc(day.and_time(schedule.evaluation_time), schedule.utc_offset);
    }
    candidate
}

fn local_to_utc(naive_local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    let naive_utc = naive_local - chrono::Duration::seconds(offset.local_minus_utc() as i64);
    Utc.from_utc_datetime(&naive_utc)
}

/// The entry point shared by the scheduled and the manual trigger: evaluate
/// the day's window, then hand the recorded results to the summary mailer
/// when one is configured. Mailer failures are logged, never propagated.
pub async fn run_daily_check(
    state: &AppState,
    day: NaiveDate,
) -> Result<Vec<StatusRecordDetails>, EvaluationError> {
    let window = window_for_day(day, &state.config.schedule);
    let records = state.engine.evaluate(&window).await?;
    info!(day = %day, recorded = records.len(), "daily check evaluated");

    let details = status_service::get_for_day(&state.db_pool, day).await?;
    if let Some(mailer) = &state.mailer {
        if let Err(e) = mailer.send_summary(day, &details).await {
            warn!(day = %day, error = %e, "failed to send summary notification");
        }
    }
    Ok(details)
}

/// Daily loop: sleep until the configured evaluation time, run the check,
/// log the outcome. The run's result is always inspected here, never
/// dropped inside a callback.
pub async fn run_scheduler(state: Arc<AppState>) {
    info!(
        evaluation_time = %state.config.schedule.evaluation_time,
        utc_offset = %state.config.schedule.utc_offset,
        "daily check scheduler started"
    );

    loop {
        let now = Utc::now();
        let next = next_run_instant(&state.config.schedule, now);
        info!(next_run = %next, "next scheduled mailbox check");

        let wait = (next - now).to_std().unwrap_or(StdDuration::ZERO);
        tokio::time::sleep(wait).await;

        let day = local_day(Utc::now(), &state.config.schedule);
        match run_daily_check(&state, day).await {
            Ok(details) => {
                info!(day = %day, client_count = details.len(), "scheduled mailbox check completed");
            }
            Err(e) => {
                error!(day = %day, error = %e, "scheduled mailbox check failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn schedule(offset_hours: i32) -> ScheduleConfig {
        ScheduleConfig {
            evaluation_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            window_start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            utc_offset: FixedOffset::east_opt(offset_hours * 3600).unwrap(),
        }
    }

    #[test]
    fn window_edges_account_for_offset() {
        let schedule = schedule(2);
        let day = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let window = window_for_day(day, &schedule);

        // 00:00 and 09:00 at +02:00 are 22:00 (previous day) and 07:00 UTC.
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2026, 8, 5, 22, 0, 0).unwrap()
        );
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2026, 8, 6, 7, 0, 0).unwrap()
        );
        assert_eq!(window.day, day);
    }

    #[test]
    fn next_run_is_today_before_the_deadline() {
        let schedule = schedule(0);
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 6, 0, 0).unwrap();
        assert_eq!(
            next_run_instant(&schedule, now),
            Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_run_rolls_to_tomorrow_after_the_deadline() {
        let schedule = schedule(0);
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap();
        assert_eq!(
            next_run_instant(&schedule, now),
            Utc.with_ymd_and_hms(2026, 8, 7, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn local_day_shifts_with_offset() {
        let schedule = schedule(2);
        // 23:30 UTC is already the next day at +02:00.
        let now = Utc.with_ymd_and_hms(2026, 8, 5, 23, 30, 0).unwrap();
        assert_eq!(
            local_day(now, &schedule),
            NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
        );
    }
}
