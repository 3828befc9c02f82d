use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::clients::ClientStore;
use crate::config::Config;
use crate::legal_entities::LegalEntityStore;
use crate::sequence::{DbSequence, SequenceGenerator};
use crate::tree::TreeEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Application configuration
    pub config: Arc<Config>,
    /// Department tree engine
    pub tree: TreeEngine,
    /// Client records
    pub clients: ClientStore,
    /// Legal entity records
    pub legal_entities: LegalEntityStore,
}

impl AppState {
    /// Create new application state
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let sequence: Arc<dyn SequenceGenerator> = Arc::new(DbSequence);
        let tree = TreeEngine::with_sequence(
            db.clone(),
            config.department.max_tree_depth,
            sequence.clone(),
        );
        let clients = ClientStore::with_sequence(db.clone(), sequence.clone());
        let legal_entities = LegalEntityStore::with_sequence(db.clone(), sequence);

        Self {
            db,
            config: Arc::new(config),
            tree,
            clients,
            legal_entities,
        }
    }
}
