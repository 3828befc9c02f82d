//! Department entity
//!
//! Table: dept_department
//!
//! Nodes are stored as a nested-set forest. `lft`/`rgt` bound the subtree of a
//! node inside its tree (`tree_id`), `level` is the distance from the root.
//! The bounds are owned by the tree engine and never supplied by callers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dept_department")]
pub struct Model {
    /// Sequence value with the department suffix appended
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(100))")]
    pub name: String,

    /// Parent department (None for roots)
    #[sea_orm(nullable)]
    pub parent_id: Option<i64>,

    pub lft: i32,

    pub rgt: i32,

    pub tree_id: i32,

    pub level: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// Parent links and membership are resolved by the tree engine with range scans

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Number of bound slots the subtree rooted here occupies
    pub fn width(&self) -> i32 {
        self.rgt - self.lft + 1
    }

    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// True when `other` lies inside this node's subtree (self included)
    pub fn contains(&self, other: &Model) -> bool {
        self.tree_id == other.tree_id && self.lft <= other.lft && other.rgt <= self.rgt
    }
}

/// Department tree node (API response)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentTree {
    pub id: i64,
    pub name: String,
    pub children: Vec<DepartmentTree>,
}

impl From<Model> for DepartmentTree {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            children: Vec::new(),
        }
    }
}

impl DepartmentTree {
    /// Pre-order list of ids in this subtree
    pub fn flatten_ids(&self) -> Vec<i64> {
        let mut out = vec![self.id];
        for child in &self.children {
            out.extend(child.flatten_ids());
        }
        out
    }
}
