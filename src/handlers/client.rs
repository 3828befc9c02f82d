//! Client handlers

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;

use crate::clients::NewClient;
use crate::entity::client::ClientResponse;
use crate::error::AppResult;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// GET /api/clients
pub async fn list_clients(State(state): State<AppState>) -> AppResult<Json<Vec<ClientResponse>>> {
    let clients = state.clients.list().await?;
    Ok(Json(clients.into_iter().map(Into::into).collect()))
}

/// POST /api/clients
pub async fn add_client(
    State(state): State<AppState>,
    Json(req): Json<NewClient>,
) -> AppResult<Json<ApiResponse<ClientResponse>>> {
    let client = state.clients.create(req).await?;
    Ok(Json(ApiResponse::success(client.into())))
}

/// GET /api/clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<ClientResponse>>> {
    let client = state.clients.get(id).await?;
    Ok(Json(ApiResponse::success(client.into())))
}

/// POST /api/clients/:id/active
pub async fn set_client_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SetActiveRequest>,
) -> AppResult<Json<ApiResponse<ClientResponse>>> {
    let client = state.clients.set_active(id, req.active).await?;
    Ok(Json(ApiResponse::success(client.into())))
}

/// DELETE /api/clients/:id
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.clients.delete(id).await?;
    Ok(Json(ApiResponse::success_msg("success")))
}
