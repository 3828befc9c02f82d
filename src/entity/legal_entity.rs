//! LegalEntity entity
//!
//! Table: dept_legal_entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dept_legal_entity")]
pub struct Model {
    /// Sequence value with the legal entity suffix appended
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(1024))")]
    pub full_name: String,

    #[sea_orm(column_type = "String(Some(500))")]
    pub short_name: String,

    /// Taxpayer number, 10 digits
    pub inn: i64,

    /// Registration reason code, 9 digits
    pub kpp: i64,

    pub created_at: DateTimeUtc,

    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Legal entity response
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalEntityResponse {
    pub id: i64,
    pub full_name: String,
    pub short_name: String,
    pub inn: i64,
    pub kpp: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

impl From<Model> for LegalEntityResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
            short_name: model.short_name,
            inn: model.inn,
            kpp: model.kpp,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
