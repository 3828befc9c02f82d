//! Deptree - client and department hierarchy administration backend
//!
//! Departments are kept as a nested-set forest with name-ordered siblings,
//! depth-limited nesting, single-read tree rendering and membership rollups.

pub mod clients;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod legal_entities;
pub mod routes;
pub mod sequence;
pub mod state;
pub mod tree;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
pub use tree::TreeEngine;
