//! Legal entity handlers

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::entity::legal_entity::LegalEntityResponse;
use crate::error::AppResult;
use crate::legal_entities::NewLegalEntity;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// GET /api/legal-entities
pub async fn list_legal_entities(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<LegalEntityResponse>>>> {
    let entities = state.legal_entities.list().await?;
    Ok(Json(ApiResponse::success(entities.into_iter().map(Into::into).collect())))
}

/// POST /api/legal-entities
pub async fn add_legal_entity(
    State(state): State<AppState>,
    Json(req): Json<NewLegalEntity>,
) -> AppResult<Json<ApiResponse<LegalEntityResponse>>> {
    let entity = state.legal_entities.create(req).await?;
    Ok(Json(ApiResponse::success(entity.into())))
}

/// GET /api/legal-entities/:id
pub async fn get_legal_entity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<LegalEntityResponse>>> {
    let entity = state.legal_entities.get(id).await?;
    Ok(Json(ApiResponse::success(entity.into())))
}

/// GET /api/legal-entities/:id/departments
pub async fn get_legal_entity_departments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<i64>>>> {
    Ok(Json(ApiResponse::success(state.legal_entities.departments(id).await?)))
}

/// DELETE /api/legal-entities/:id
pub async fn delete_legal_entity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.legal_entities.delete(id).await?;
    Ok(Json(ApiResponse::success_msg("success")))
}
