use axum::{http::Method, routing::get, Router};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::checks::engine::CheckEngine;
use crate::config::AppConfig;
use crate::notifications::SummaryMailer;

pub mod error;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub engine: Arc<CheckEngine>,
    pub mailer: Option<Arc<SummaryMailer>>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    // The dashboard is an external consumer; let it call from anywhere.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/clients", routes::client_routes::create_client_router())
        .nest("/api/checks", routes::check_routes::create_check_router())
        .nest("/api/status", routes::check_routes::create_status_router())
        .with_state(app_state)
        .layer(cors)
}
