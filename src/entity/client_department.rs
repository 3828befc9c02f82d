//! ClientDepartment entity - client membership in departments
//!
//! Table: dept_client_department

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dept_client_department")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub client_id: i64,

    pub department_id: i64,

    /// Set once when the membership is created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Membership response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MembershipResponse {
    #[serde(rename = "clientId")]
    pub client_id: i64,
    #[serde(rename = "departmentId")]
    pub department_id: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTimeUtc,
}

impl From<Model> for MembershipResponse {
    fn from(model: Model) -> Self {
        Self {
            client_id: model.client_id,
            department_id: model.department_id,
            created_at: model.created_at,
        }
    }
}
