use axum::{
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: true,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn success_msg(message: impl Into<String>) -> Self {
        Self {
            code: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Config routes
        .route("/config", get(handlers::config::get_config))
        // Department routes
        .route(
            "/departments",
            get(handlers::department::list_departments).post(handlers::department::add_department),
        )
        .route(
            "/departments/:id",
            get(handlers::department::get_department).delete(handlers::department::delete_department),
        )
        .route("/departments/:id/ancestors", get(handlers::department::get_ancestors))
        .route("/departments/:id/descendants", get(handlers::department::get_descendants))
        .route("/departments/:id/children", get(handlers::department::get_children))
        .route("/departments/:id/move", post(handlers::department::move_department))
        .route("/departments/:id/rename", post(handlers::department::rename_department))
        .route(
            "/departments/:id/members",
            get(handlers::department::get_members).post(handlers::department::add_member),
        )
        .route("/departments/:id/members/count", get(handlers::department::get_member_count))
        .route(
            "/departments/:id/members/:client_id",
            delete(handlers::department::remove_member),
        )
        .route(
            "/departments/:id/legal-entities",
            get(handlers::department::get_legal_entities)
                .post(handlers::department::link_legal_entity),
        )
        .route(
            "/departments/:id/legal-entities/:legal_entity_id",
            delete(handlers::department::unlink_legal_entity),
        )
        // Client routes
        .route(
            "/clients",
            get(handlers::client::list_clients).post(handlers::client::add_client),
        )
        .route(
            "/clients/:id",
            get(handlers::client::get_client).delete(handlers::client::delete_client),
        )
        .route("/clients/:id/active", post(handlers::client::set_client_active))
        // Legal entity routes
        .route(
            "/legal-entities",
            get(handlers::legal_entity::list_legal_entities)
                .post(handlers::legal_entity::add_legal_entity),
        )
        .route(
            "/legal-entities/:id",
            get(handlers::legal_entity::get_legal_entity)
                .delete(handlers::legal_entity::delete_legal_entity),
        )
        .route(
            "/legal-entities/:id/departments",
            get(handlers::legal_entity::get_legal_entity_departments),
        );

    Router::new()
        .nest("/api", api_routes)
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback handler for 404
pub async fn fallback() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not Found")))
}
