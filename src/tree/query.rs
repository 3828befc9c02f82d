//! Read side: range scans over maintained bounds

use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
};

use super::forest::{build_forest, sort_roots};
use super::{find_children, find_node, TreeEngine};
use crate::entity::client_department;
use crate::entity::department::{self, DepartmentTree};
use crate::error::AppResult;

impl TreeEngine {
    pub async fn get(&self, id: i64) -> AppResult<department::Model> {
        find_node(&self.db, id).await
    }

    /// Root first, parent last
    pub async fn ancestors(&self, id: i64) -> AppResult<Vec<department::Model>> {
        let txn = self.begin_read().await?;
        let node = find_node(&txn, id).await?;
        let ancestors = if node.is_root() {
            Vec::new()
        } else {
            department::Entity::find()
                .filter(department::Column::TreeId.eq(node.tree_id))
                .filter(department::Column::Lft.lt(node.lft))
                .filter(department::Column::Rgt.gt(node.rgt))
                .order_by_asc(department::Column::Lft)
                .all(&txn)
                .await?
        };
        txn.commit().await?;
        Ok(ancestors)
    }

    /// Whole subtree below `id` in pre-order, `id` itself excluded
    pub async fn descendants(&self, id: i64) -> AppResult<Vec<department::Model>> {
        let txn = self.begin_read().await?;
        let node = find_node(&txn, id).await?;
        let descendants = if node.is_leaf() {
            Vec::new()
        } else {
            department::Entity::find()
                .filter(department::Column::TreeId.eq(node.tree_id))
                .filter(department::Column::Lft.gt(node.lft))
                .filter(department::Column::Rgt.lt(node.rgt))
                .order_by_asc(department::Column::Lft)
                .all(&txn)
                .await?
        };
        txn.commit().await?;
        Ok(descendants)
    }

    /// Direct children in name order
    pub async fn children(&self, id: i64) -> AppResult<Vec<department::Model>> {
        let txn = self.begin_read().await?;
        find_node(&txn, id).await?;
        let children = find_children(&txn, id).await?;
        txn.commit().await?;
        Ok(children)
    }

    /// Departments without a parent, by name
    pub async fn roots(&self) -> AppResult<Vec<department::Model>> {
        let mut roots = department::Entity::find()
            .filter(department::Column::ParentId.is_null())
            .order_by_asc(department::Column::TreeId)
            .all(&self.db)
            .await?;
        // Byte order, same as sibling placement
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roots)
    }

    /// Every tree as nested `{id, name, children}` nodes, built from a
    /// single ordered read of the whole table
    pub async fn cached_forest(&self) -> AppResult<Vec<DepartmentTree>> {
        let rows = department::Entity::find()
            .order_by_asc(department::Column::TreeId)
            .order_by_asc(department::Column::Lft)
            .all(&self.db)
            .await?;
        let count = rows.len();

        let mut forest = build_forest(rows);
        sort_roots(&mut forest);
        tracing::debug!("Built {} department tree(s) from {} row(s)", forest.len(), count);
        Ok(forest)
    }

    /// Distinct clients belonging to `id` or any department below it
    pub async fn member_count(&self, id: i64) -> AppResult<u64> {
        let txn = self.begin_read().await?;
        let node = find_node(&txn, id).await?;

        let count = client_department::Entity::find()
            .select_only()
            .column(client_department::Column::ClientId)
            .distinct()
            .filter(client_department::Column::DepartmentId.in_subquery(subtree_ids(&node)))
            .count(&txn)
            .await?;
        txn.commit().await?;
        Ok(count)
    }
}

/// `SELECT id` over the subtree of `node`, itself included
pub(crate) fn subtree_ids(node: &department::Model) -> sea_orm::sea_query::SelectStatement {
    department::Entity::find()
        .select_only()
        .column(department::Column::Id)
        .filter(department::Column::TreeId.eq(node.tree_id))
        .filter(department::Column::Lft.between(node.lft, node.rgt))
        .into_query()
}
