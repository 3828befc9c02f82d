//! Department tree engine
//!
//! Departments form a forest stored as nested sets: every node carries
//! `lft`/`rgt` bounds, a `tree_id` and a `level`. Subtree and ancestor reads
//! are single bounded range scans; writes shift the bounds of the affected
//! tree inside one transaction while holding that tree's writer lock.
//! Reads that look up bounds before scanning run in one read-only
//! transaction so they never mix two versions of a tree.

pub mod forest;
pub mod locks;
mod membership;
mod mutate;
mod query;

#[cfg(test)]
mod tests;

use sea_orm::{
    AccessMode, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
    EntityTrait, IsolationLevel, QueryFilter, QueryOrder, TransactionTrait,
};
use std::sync::Arc;

use crate::entity::department;
use crate::error::{AppError, AppResult, OptionExt};
use crate::sequence::{DbSequence, SequenceGenerator};
use locks::{TreeLocks, WriteGuard};

/// Maximum department name length in characters
pub const MAX_NAME_LEN: usize = 100;

/// Nested-set engine over the `dept_department` table
#[derive(Clone)]
pub struct TreeEngine {
    db: DatabaseConnection,
    max_depth: i32,
    sequence: Arc<dyn SequenceGenerator>,
    locks: Arc<TreeLocks>,
}

/// An open write transaction holding the locks of the trees it touches
struct Locked {
    _guard: WriteGuard,
    txn: DatabaseTransaction,
    nodes: Vec<department::Model>,
}

impl TreeEngine {
    pub fn new(db: DatabaseConnection, max_depth: i32) -> Self {
        Self::with_sequence(db, max_depth, Arc::new(DbSequence))
    }

    pub fn with_sequence(
        db: DatabaseConnection,
        max_depth: i32,
        sequence: Arc<dyn SequenceGenerator>,
    ) -> Self {
        Self {
            db,
            max_depth,
            sequence,
            locks: Arc::new(TreeLocks::new()),
        }
    }

    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Reject levels beyond the configured maximum
    fn check_depth(&self, level: i32) -> AppResult<()> {
        if level > self.max_depth {
            return Err(AppError::DepthExceeded {
                level,
                max: self.max_depth,
            });
        }
        Ok(())
    }

    /// Open a read-only transaction so a bound lookup and the range scan
    /// that uses it see the same snapshot.
    async fn begin_read(&self) -> AppResult<DatabaseTransaction> {
        let txn = match self.db.get_database_backend() {
            // The single sqlite connection is pinned for the whole transaction
            DbBackend::Sqlite => self.db.begin().await?,
            _ => {
                self.db
                    .begin_with_config(
                        Some(IsolationLevel::RepeatableRead),
                        Some(AccessMode::ReadOnly),
                    )
                    .await?
            }
        };
        Ok(txn)
    }

    /// Lock the trees owning `ids` and open a transaction.
    ///
    /// A node can move to another tree while we wait for its lock, so the
    /// nodes are re-read inside the transaction and the whole step retried
    /// when any tree_id changed.
    async fn begin_locked(&self, forest: bool, ids: &[i64]) -> AppResult<Locked> {
        loop {
            let mut snapshot = Vec::with_capacity(ids.len());
            for id in ids {
                snapshot.push(find_node(&self.db, *id).await?);
            }
            let tree_ids: Vec<i32> = snapshot.iter().map(|n| n.tree_id).collect();

            let guard = self.locks.acquire(forest, &tree_ids).await;
            let txn = self.db.begin().await?;

            let mut nodes = Vec::with_capacity(ids.len());
            for id in ids {
                nodes.push(find_node(&txn, *id).await?);
            }

            if nodes.iter().map(|n| n.tree_id).eq(tree_ids.iter().copied()) {
                return Ok(Locked {
                    _guard: guard,
                    txn,
                    nodes,
                });
            }

            tracing::debug!("Department moved while waiting for its tree lock, retrying");
            txn.rollback().await?;
        }
    }
}

/// Trimmed name, or a validation error
pub fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("department name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "department name must not exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

pub(crate) async fn find_node<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<department::Model> {
    department::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_not_found(format!("department {}", id))
}

/// Direct children of `parent_id` in bound order
pub(crate) async fn find_children<C: ConnectionTrait>(
    conn: &C,
    parent_id: i64,
) -> AppResult<Vec<department::Model>> {
    Ok(department::Entity::find()
        .filter(department::Column::ParentId.eq(parent_id))
        .order_by_asc(department::Column::Lft)
        .all(conn)
        .await?)
}
