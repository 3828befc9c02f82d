//! Insert, move, rename and delete

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::query::subtree_ids;
use super::{find_children, find_node, validate_name, Locked, TreeEngine};
use crate::entity::{client_department, department, legal_entity_department};
use crate::error::{AppError, AppResult};
use crate::sequence::{next_id, DEPARTMENT_SEQUENCE, DEPARTMENT_SUFFIX};

impl TreeEngine {
    /// Create a department under `parent_id`, or as a new root.
    ///
    /// The node is placed after every sibling whose name sorts at or before
    /// its own, so equal names keep insertion order.
    pub async fn insert(&self, name: &str, parent_id: Option<i64>) -> AppResult<department::Model> {
        let name = validate_name(name)?;

        let Some(parent_id) = parent_id else {
            let _guard = self.locks.acquire(true, &[]).await;
            let txn = self.db.begin().await?;

            let id = next_id(&*self.sequence, &txn, DEPARTMENT_SEQUENCE, DEPARTMENT_SUFFIX).await?;
            let tree_id = next_tree_id(&txn).await?;
            let model = department::ActiveModel {
                id: Set(id),
                name: Set(name),
                parent_id: Set(None),
                lft: Set(1),
                rgt: Set(2),
                tree_id: Set(tree_id),
                level: Set(0),
            }
            .insert(&txn)
            .await?;

            txn.commit().await?;
            tracing::info!("Created root department {} '{}' (tree {})", model.id, model.name, tree_id);
            return Ok(model);
        };

        let Locked { _guard, txn, nodes } = self.begin_locked(false, &[parent_id]).await?;
        let parent = &nodes[0];
        self.check_depth(parent.level + 1)?;

        let id = next_id(&*self.sequence, &txn, DEPARTMENT_SEQUENCE, DEPARTMENT_SUFFIX).await?;
        let pos = insertion_point(&txn, parent, &name, None).await?;
        open_gap(&txn, parent.tree_id, pos, 2).await?;

        let model = department::ActiveModel {
            id: Set(id),
            name: Set(name),
            parent_id: Set(Some(parent.id)),
            lft: Set(pos),
            rgt: Set(pos + 1),
            tree_id: Set(parent.tree_id),
            level: Set(parent.level + 1),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        tracing::info!(
            "Created department {} '{}' under {} at level {}",
            model.id,
            model.name,
            parent_id,
            model.level
        );
        Ok(model)
    }

    /// Re-parent a department together with its subtree
    pub async fn move_node(
        &self,
        id: i64,
        new_parent_id: Option<i64>,
    ) -> AppResult<department::Model> {
        let ids: Vec<i64> = std::iter::once(id).chain(new_parent_id).collect();
        let Locked { _guard, txn, nodes } = self.begin_locked(true, &ids).await?;
        let node = nodes[0].clone();
        let parent = nodes.get(1).cloned();

        if node.is_root() && parent.is_none() {
            return Ok(node);
        }

        if let Some(parent) = &parent {
            if node.contains(parent) {
                return Err(AppError::CycleDetected(format!(
                    "department {} cannot move under its own subtree node {}",
                    node.id, parent.id
                )));
            }
        }

        let new_level = parent.as_ref().map_or(0, |p| p.level + 1);
        let height = subtree_height(&txn, &node).await?;
        self.check_depth(new_level + height)?;

        let moved = relocate(&txn, &node, parent.map(|p| p.id)).await?;
        txn.commit().await?;

        tracing::info!(
            "Moved department {} to {:?} (tree {} -> {})",
            moved.id,
            new_parent_id,
            node.tree_id,
            moved.tree_id
        );
        Ok(moved)
    }

    /// Rename a department and restore name order among its siblings
    pub async fn rename(&self, id: i64, name: &str) -> AppResult<department::Model> {
        let name = validate_name(name)?;
        let Locked { _guard, txn, nodes } = self.begin_locked(true, &[id]).await?;
        let node = &nodes[0];

        let mut active: department::ActiveModel = node.clone().into();
        active.name = Set(name);
        let renamed = active.update(&txn).await?;

        let renamed = match renamed.parent_id {
            Some(parent_id) => relocate(&txn, &renamed, Some(parent_id)).await?,
            None => renamed,
        };

        txn.commit().await?;
        tracing::info!("Renamed department {} '{}' -> '{}'", id, node.name, renamed.name);
        Ok(renamed)
    }

    /// Delete a department, its subtree and every client membership and
    /// legal entity link of the removed departments. Returns the removed ids.
    pub async fn delete(&self, id: i64) -> AppResult<Vec<i64>> {
        let Locked { _guard, txn, nodes } = self.begin_locked(false, &[id]).await?;
        let node = &nodes[0];

        let removed: Vec<i64> = department::Entity::find()
            .select_only()
            .column(department::Column::Id)
            .filter(department::Column::TreeId.eq(node.tree_id))
            .filter(department::Column::Lft.between(node.lft, node.rgt))
            .order_by_asc(department::Column::Lft)
            .into_tuple::<i64>()
            .all(&txn)
            .await?;

        let memberships = client_department::Entity::delete_many()
            .filter(client_department::Column::DepartmentId.in_subquery(subtree_ids(node)))
            .exec(&txn)
            .await?;
        let links = legal_entity_department::Entity::delete_many()
            .filter(legal_entity_department::Column::DepartmentId.in_subquery(subtree_ids(node)))
            .exec(&txn)
            .await?;

        department::Entity::delete_many()
            .filter(department::Column::TreeId.eq(node.tree_id))
            .filter(department::Column::Lft.between(node.lft, node.rgt))
            .exec(&txn)
            .await?;

        close_gap(&txn, node.tree_id, node.rgt, node.width()).await?;
        txn.commit().await?;

        tracing::info!(
            "Deleted department {} with {} descendant(s), {} membership(s) and {} legal entity link(s)",
            id,
            removed.len().saturating_sub(1),
            memberships.rows_affected,
            links.rows_affected
        );
        Ok(removed)
    }
}

/// One past the largest tree id in use
async fn next_tree_id<C: ConnectionTrait>(conn: &C) -> AppResult<i32> {
    let last = department::Entity::find()
        .order_by_desc(department::Column::TreeId)
        .one(conn)
        .await?;
    Ok(last.map_or(1, |d| d.tree_id + 1))
}

/// Levels below `node` in its subtree (0 for a leaf)
async fn subtree_height<C: ConnectionTrait>(conn: &C, node: &department::Model) -> AppResult<i32> {
    if node.is_leaf() {
        return Ok(0);
    }
    let deepest = department::Entity::find()
        .filter(department::Column::TreeId.eq(node.tree_id))
        .filter(department::Column::Lft.between(node.lft, node.rgt))
        .order_by_desc(department::Column::Level)
        .one(conn)
        .await?;
    Ok(deepest.map_or(0, |d| d.level - node.level))
}

/// Bound where a child called `name` goes under `parent`: before the first
/// sibling whose name sorts strictly after it, else at the end.
async fn insertion_point<C: ConnectionTrait>(
    conn: &C,
    parent: &department::Model,
    name: &str,
    exclude: Option<i64>,
) -> AppResult<i32> {
    let siblings = find_children(conn, parent.id).await?;
    Ok(siblings
        .iter()
        .filter(|s| Some(s.id) != exclude)
        .find(|s| s.name.as_str() > name)
        .map_or(parent.rgt, |s| s.lft))
}

/// Make room for `width` bounds starting at `pos`
async fn open_gap<C: ConnectionTrait>(conn: &C, tree_id: i32, pos: i32, width: i32) -> AppResult<()> {
    tracing::debug!("Opening gap of {} at {} in tree {}", width, pos, tree_id);
    department::Entity::update_many()
        .col_expr(department::Column::Lft, Expr::col(department::Column::Lft).add(width))
        .filter(department::Column::TreeId.eq(tree_id))
        .filter(department::Column::Lft.gte(pos))
        .exec(conn)
        .await?;
    department::Entity::update_many()
        .col_expr(department::Column::Rgt, Expr::col(department::Column::Rgt).add(width))
        .filter(department::Column::TreeId.eq(tree_id))
        .filter(department::Column::Rgt.gte(pos))
        .exec(conn)
        .await?;
    Ok(())
}

/// Close the gap left by `width` bounds ending at `end`
async fn close_gap<C: ConnectionTrait>(conn: &C, tree_id: i32, end: i32, width: i32) -> AppResult<()> {
    tracing::debug!("Closing gap of {} after {} in tree {}", width, end, tree_id);
    department::Entity::update_many()
        .col_expr(department::Column::Lft, Expr::col(department::Column::Lft).sub(width))
        .filter(department::Column::TreeId.eq(tree_id))
        .filter(department::Column::Lft.gt(end))
        .exec(conn)
        .await?;
    department::Entity::update_many()
        .col_expr(department::Column::Rgt, Expr::col(department::Column::Rgt).sub(width))
        .filter(department::Column::TreeId.eq(tree_id))
        .filter(department::Column::Rgt.gt(end))
        .exec(conn)
        .await?;
    Ok(())
}

/// Detach the subtree of `node` and re-attach it under `parent_id`, or as
/// the root of a new tree. Caller holds the forest lock and the locks of
/// both trees.
async fn relocate(
    txn: &DatabaseTransaction,
    node: &department::Model,
    parent_id: Option<i64>,
) -> AppResult<department::Model> {
    let width = node.width();
    let staging = next_tree_id(txn).await?;
    let new_level = match parent_id {
        Some(pid) => find_node(txn, pid).await?.level + 1,
        None => 0,
    };

    // Lift the subtree out as a standalone tree [1, width]
    department::Entity::update_many()
        .col_expr(department::Column::TreeId, Expr::value(staging))
        .col_expr(department::Column::Lft, Expr::col(department::Column::Lft).sub(node.lft - 1))
        .col_expr(department::Column::Rgt, Expr::col(department::Column::Rgt).sub(node.lft - 1))
        .col_expr(
            department::Column::Level,
            Expr::col(department::Column::Level).add(new_level - node.level),
        )
        .filter(department::Column::TreeId.eq(node.tree_id))
        .filter(department::Column::Lft.between(node.lft, node.rgt))
        .exec(txn)
        .await?;
    close_gap(txn, node.tree_id, node.rgt, width).await?;

    if let Some(parent_id) = parent_id {
        // Bounds of the parent may have shifted while closing the gap
        let parent = find_node(txn, parent_id).await?;
        let pos = insertion_point(txn, &parent, &node.name, Some(node.id)).await?;
        open_gap(txn, parent.tree_id, pos, width).await?;

        department::Entity::update_many()
            .col_expr(department::Column::TreeId, Expr::value(parent.tree_id))
            .col_expr(department::Column::Lft, Expr::col(department::Column::Lft).add(pos - 1))
            .col_expr(department::Column::Rgt, Expr::col(department::Column::Rgt).add(pos - 1))
            .filter(department::Column::TreeId.eq(staging))
            .exec(txn)
            .await?;
    }

    department::Entity::update_many()
        .col_expr(department::Column::ParentId, Expr::value(parent_id))
        .filter(department::Column::Id.eq(node.id))
        .exec(txn)
        .await?;

    find_node(txn, node.id).await
}
