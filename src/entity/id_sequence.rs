//! IdSequence entity - named monotonic counters
//!
//! Table: dept_id_sequence

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dept_id_sequence")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "String(Some(100))")]
    pub name: String,

    /// Last value handed out
    pub last: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
