//! Configuration handlers
//!
//! Returns public configuration settings to the admin UI

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::state::AppState;

/// Public configuration response
#[derive(Debug, Serialize)]
pub struct PublicConfig {
    /// Deepest level a department may sit at (roots are level 0)
    #[serde(rename = "maxTreeDepth")]
    pub max_tree_depth: i32,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig {
        max_tree_depth: state.tree.max_depth(),
    })
}
