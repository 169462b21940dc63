use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::db::services::{client_service, status_service};
use crate::web::models::{
    ClientResponse, CreateClientRequest, StatusRecordResponse, UpdateClientRequest,
};
use crate::web::{AppError, AppState};

pub fn create_client_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route(
            "/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/{id}/status/latest", get(latest_status))
}

#[axum::debug_handler]
async fn list_clients(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let clients = client_service::list(&app_state.db_pool).await?;
    Ok(Json(clients.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
async fn create_client(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), AppError> {
    if payload.name.trim().is_empty() || payload.pattern.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "name and pattern are required".to_string(),
        ));
    }

    let created = client_service::create(&app_state.db_pool, payload.into_new_client()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[axum::debug_handler]
async fn get_client(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = client_service::get(&app_state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(Json(client.into()))
}

#[axum::debug_handler]
async fn update_client(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty())
        || payload
            .pattern
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
    {
        return Err(AppError::InvalidInput(
            "name and pattern must not be empty".to_string(),
        ));
    }

    let updated = client_service::update(&app_state.db_pool, id, payload.into())
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(Json(updated.into()))
}

#[axum::debug_handler]
async fn delete_client(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = client_service::delete(&app_state.db_pool, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Client not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
async fn latest_status(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<StatusRecordResponse>, AppError> {
    let record = status_service::latest(&app_state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("No status recorded for client".to_string()))?;
    Ok(Json(record.into()))
}
