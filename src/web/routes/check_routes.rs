use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::checks::scheduler;
use crate::db::services::status_service;
use crate::web::models::{RunRequest, RunResponse, StatusQuery, StatusRecordResponse};
use crate::web::{AppError, AppState};

pub fn create_check_router() -> Router<Arc<AppState>> {
    Router::new().route("/run", post(run_check))
}

pub fn create_status_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_status))
}

/// Manual trigger. Shares the evaluation entry point with the scheduler, so
/// the per-day run lock arbitrates between the two.
#[axum::debug_handler]
async fn run_check(
    State(app_state): State<Arc<AppState>>,
    payload: Option<Json<RunRequest>>,
) -> Result<Json<RunResponse>, AppError> {
    let day = payload
        .and_then(|Json(request)| request.day)
        .unwrap_or_else(|| scheduler::local_day(Utc::now(), &app_state.config.schedule));

    let details = scheduler::run_daily_check(&app_state, day).await?;
    Ok(Json(RunResponse {
        day,
        records: details.into_iter().map(Into::into).collect(),
    }))
}

#[axum::debug_handler]
async fn get_status(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<StatusRecordResponse>>, AppError> {
    let day = query
        .day
        .unwrap_or_else(|| scheduler::local_day(Utc::now(), &app_state.config.schedule));

    let details = status_service::get_for_day(&app_state.db_pool, day).await?;
    Ok(Json(details.into_iter().map(Into::into).collect()))
}
