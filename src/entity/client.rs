//! Client entity
//!
//! Table: dept_client

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Client type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Primary,
    Repeated,
    External,
    Indirect,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Primary => "primary",
            ClientType::Repeated => "repeated",
            ClientType::External => "external",
            ClientType::Indirect => "indirect",
        }
    }
}

/// Gender
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dept_client")]
pub struct Model {
    /// Sequence value with the user suffix appended
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(150))", unique)]
    pub username: String,

    #[sea_orm(column_type = "String(Some(32))", unique)]
    pub phone: String,

    #[sea_orm(column_type = "String(Some(150))")]
    pub first_name: String,

    #[sea_orm(column_type = "String(Some(150))")]
    pub last_name: String,

    #[sea_orm(column_type = "String(Some(150))")]
    pub middle_name: String,

    pub is_active: bool,

    /// primary / repeated / external / indirect, empty when unset
    #[sea_orm(column_type = "String(Some(50))")]
    pub client_type: String,

    #[sea_orm(column_type = "String(Some(50))")]
    pub gender: String,

    #[sea_orm(column_type = "String(Some(50))")]
    pub timezone: String,

    pub is_admin: bool,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeUtc>,

    /// Last time `is_active` flipped
    #[sea_orm(nullable)]
    pub status_changed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Client response
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: i64,
    pub username: String,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
    pub status_changed_at: Option<DateTimeUtc>,
    pub is_active: bool,
    #[serde(rename = "type")]
    pub client_type: String,
    pub gender: String,
    pub timezone: String,
}

impl From<Model> for ClientResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            phone: model.phone,
            first_name: model.first_name,
            last_name: model.last_name,
            middle_name: model.middle_name,
            created_at: model.created_at,
            updated_at: model.updated_at,
            status_changed_at: model.status_changed_at,
            is_active: model.is_active,
            client_type: model.client_type,
            gender: model.gender,
            timezone: model.timezone,
        }
    }
}
