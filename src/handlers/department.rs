//! Department handlers
//!
//! Thin JSON wrappers over the tree engine

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::entity::client_department::MembershipResponse;
use crate::entity::department::{self, DepartmentTree};
use crate::entity::legal_entity_department::LegalEntityLinkResponse;
use crate::error::AppResult;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Add department request
#[derive(Debug, Deserialize)]
pub struct AddDepartmentRequest {
    pub name: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
}

/// Move department request (no parentId makes it a root)
#[derive(Debug, Deserialize)]
pub struct MoveDepartmentRequest {
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RenameDepartmentRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    #[serde(rename = "clientId")]
    pub client_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LinkLegalEntityRequest {
    #[serde(rename = "legalEntityId")]
    pub legal_entity_id: i64,
}

/// Department response
#[derive(Debug, Serialize)]
pub struct DepartmentResponse {
    pub id: i64,
    pub name: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
    pub level: i32,
    #[serde(rename = "treeId")]
    pub tree_id: i32,
}

impl From<department::Model> for DepartmentResponse {
    fn from(m: department::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            parent_id: m.parent_id,
            level: m.level,
            tree_id: m.tree_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberCountResponse {
    pub id: i64,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteDepartmentResponse {
    pub removed: Vec<i64>,
}

fn to_responses(models: Vec<department::Model>) -> Vec<DepartmentResponse> {
    models.into_iter().map(Into::into).collect()
}

/// GET /api/departments
pub async fn list_departments(State(state): State<AppState>) -> AppResult<Json<Vec<DepartmentTree>>> {
    Ok(Json(state.tree.cached_forest().await?))
}

/// POST /api/departments
pub async fn add_department(
    State(state): State<AppState>,
    Json(req): Json<AddDepartmentRequest>,
) -> AppResult<Json<ApiResponse<DepartmentResponse>>> {
    let dept = state.tree.insert(&req.name, req.parent_id).await?;
    Ok(Json(ApiResponse::success(dept.into())))
}

/// GET /api/departments/:id
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<DepartmentResponse>>> {
    let dept = state.tree.get(id).await?;
    Ok(Json(ApiResponse::success(dept.into())))
}

/// DELETE /api/departments/:id
pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<DeleteDepartmentResponse>>> {
    let removed = state.tree.delete(id).await?;
    Ok(Json(ApiResponse::success(DeleteDepartmentResponse { removed })))
}

/// GET /api/departments/:id/ancestors
pub async fn get_ancestors(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<DepartmentResponse>>>> {
    let ancestors = state.tree.ancestors(id).await?;
    Ok(Json(ApiResponse::success(to_responses(ancestors))))
}

/// GET /api/departments/:id/descendants
pub async fn get_descendants(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<DepartmentResponse>>>> {
    let descendants = state.tree.descendants(id).await?;
    Ok(Json(ApiResponse::success(to_responses(descendants))))
}

/// GET /api/departments/:id/children
pub async fn get_children(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<DepartmentResponse>>>> {
    let children = state.tree.children(id).await?;
    Ok(Json(ApiResponse::success(to_responses(children))))
}

/// POST /api/departments/:id/move
pub async fn move_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<MoveDepartmentRequest>,
) -> AppResult<Json<ApiResponse<DepartmentResponse>>> {
    let dept = state.tree.move_node(id, req.parent_id).await?;
    Ok(Json(ApiResponse::success(dept.into())))
}

/// POST /api/departments/:id/rename
pub async fn rename_department(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RenameDepartmentRequest>,
) -> AppResult<Json<ApiResponse<DepartmentResponse>>> {
    let dept = state.tree.rename(id, &req.name).await?;
    Ok(Json(ApiResponse::success(dept.into())))
}

/// GET /api/departments/:id/members
pub async fn get_members(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<i64>>>> {
    Ok(Json(ApiResponse::success(state.tree.members(id).await?)))
}

/// POST /api/departments/:id/members
pub async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AddMemberRequest>,
) -> AppResult<Json<ApiResponse<MembershipResponse>>> {
    let membership = state.tree.add_member(req.client_id, id).await?;
    Ok(Json(ApiResponse::success(membership.into())))
}

/// DELETE /api/departments/:id/members/:client_id
pub async fn remove_member(
    State(state): State<AppState>,
    Path((id, client_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.tree.remove_member(client_id, id).await?;
    Ok(Json(ApiResponse::success_msg("success")))
}

/// GET /api/departments/:id/members/count
pub async fn get_member_count(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<MemberCountResponse>>> {
    let count = state.tree.member_count(id).await?;
    Ok(Json(ApiResponse::success(MemberCountResponse { id, count })))
}

/// GET /api/departments/:id/legal-entities
pub async fn get_legal_entities(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<i64>>>> {
    Ok(Json(ApiResponse::success(state.tree.legal_entities(id).await?)))
}

/// POST /api/departments/:id/legal-entities
pub async fn link_legal_entity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<LinkLegalEntityRequest>,
) -> AppResult<Json<ApiResponse<LegalEntityLinkResponse>>> {
    let link = state.tree.link_legal_entity(req.legal_entity_id, id).await?;
    Ok(Json(ApiResponse::success(link.into())))
}

/// DELETE /api/departments/:id/legal-entities/:legal_entity_id
pub async fn unlink_legal_entity(
    State(state): State<AppState>,
    Path((id, legal_entity_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.tree.unlink_legal_entity(legal_entity_id, id).await?;
    Ok(Json(ApiResponse::success_msg("success")))
}
