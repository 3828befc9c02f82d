//! LegalEntityDepartment entity - departments a legal entity is attached to
//!
//! Table: dept_legal_entity_department

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dept_legal_entity_department")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub legal_entity_id: i64,

    pub department_id: i64,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalEntityLinkResponse {
    pub legal_entity_id: i64,
    pub department_id: i64,
    pub created_at: DateTimeUtc,
}

impl From<Model> for LegalEntityLinkResponse {
    fn from(model: Model) -> Self {
        Self {
            legal_entity_id: model.legal_entity_id,
            department_id: model.department_id,
            created_at: model.created_at,
        }
    }
}
