//! Client store
//!
//! Clients are plain records; the department engine only consumes their ids.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::entity::client::{self, ClientType, Gender};
use crate::entity::client_department;
use crate::error::{conflict_on_unique, AppError, AppResult, OptionExt};
use crate::sequence::{next_id, DbSequence, SequenceGenerator, USER_SEQUENCE, USER_SUFFIX};

/// Fields accepted when creating a client
#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub username: String,
    pub phone: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "middleName", default)]
    pub middle_name: String,
    #[serde(rename = "type", default)]
    pub client_type: Option<ClientType>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(rename = "isActive", default = "default_active")]
    pub is_active: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_active() -> bool {
    true
}

#[derive(Clone)]
pub struct ClientStore {
    db: DatabaseConnection,
    sequence: Arc<dyn SequenceGenerator>,
}

impl ClientStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_sequence(db, Arc::new(DbSequence))
    }

    pub fn with_sequence(db: DatabaseConnection, sequence: Arc<dyn SequenceGenerator>) -> Self {
        Self { db, sequence }
    }

    pub async fn create(&self, new: NewClient) -> AppResult<client::Model> {
        let username = validate_username(&new.username)?;
        let phone = validate_phone(&new.phone)?;

        let txn = self.db.begin().await?;

        let taken = client::Entity::find()
            .filter(
                Condition::any()
                    .add(client::Column::Username.eq(username.as_str()))
                    .add(client::Column::Phone.eq(phone.as_str())),
            )
            .one(&txn)
            .await?;
        if let Some(taken) = taken {
            let field = if taken.username == username { "username" } else { "phone" };
            return Err(AppError::Conflict(format!("{} already in use", field)));
        }

        let id = next_id(&*self.sequence, &txn, USER_SEQUENCE, USER_SUFFIX).await?;
        let model = insert_client(&txn, client::ActiveModel {
            id: Set(id),
            username: Set(username),
            phone: Set(phone),
            first_name: Set(new.first_name.trim().to_string()),
            last_name: Set(new.last_name.trim().to_string()),
            middle_name: Set(new.middle_name.trim().to_string()),
            is_active: Set(new.is_active),
            client_type: Set(new.client_type.map(|t| t.as_str().to_string()).unwrap_or_default()),
            gender: Set(new.gender.as_str().to_string()),
            timezone: Set(new.timezone),
            is_admin: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            status_changed_at: Set(None),
        })
        .await?;

        txn.commit().await?;
        tracing::info!("Created client {} '{}'", model.id, model.username);
        Ok(model)
    }

    pub async fn get(&self, id: i64) -> AppResult<client::Model> {
        client::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found(format!("client {}", id))
    }

    /// All clients, oldest first
    pub async fn list(&self) -> AppResult<Vec<client::Model>> {
        Ok(client::Entity::find()
            .order_by_asc(client::Column::CreatedAt)
            .order_by_asc(client::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Activate or deactivate a client.
    ///
    /// The persisted flag is read inside the same transaction;
    /// `status_changed_at` is stamped only when it actually flips.
    pub async fn set_active(&self, id: i64, active: bool) -> AppResult<client::Model> {
        let txn = self.db.begin().await?;
        let current = client::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_not_found(format!("client {}", id))?;

        let now = Utc::now();
        let changed = current.is_active != active;
        let mut model: client::ActiveModel = current.into();
        model.is_active = Set(active);
        model.updated_at = Set(Some(now));
        if changed {
            model.status_changed_at = Set(Some(now));
        }
        let updated = model.update(&txn).await?;
        txn.commit().await?;

        if changed {
            tracing::info!("Client {} is now {}", id, if active { "active" } else { "inactive" });
        }
        Ok(updated)
    }

    /// Delete a client and its department memberships
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let txn = self.db.begin().await?;
        client_department::Entity::delete_many()
            .filter(client_department::Column::ClientId.eq(id))
            .exec(&txn)
            .await?;
        let result = client::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("client {}", id)));
        }
        txn.commit().await?;
        tracing::info!("Deleted client {}", id);
        Ok(())
    }
}

/// Insert relying on the unique indexes when a concurrent create slipped
/// past the lookup
async fn insert_client(
    txn: &DatabaseTransaction,
    model: client::ActiveModel,
) -> AppResult<client::Model> {
    model
        .insert(txn)
        .await
        .map_err(|err| conflict_on_unique(err, "username or phone"))
}

/// Letters, digits and @ . + - _ only, at most 150 characters
fn validate_username(username: &str) -> AppResult<String> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > 150 {
        return Err(AppError::Validation(
            "username must be 1 to 150 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::Validation(
            "username may contain only letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(username.to_string())
}

/// International format: `+` then 8 to 15 digits
fn validate_phone(phone: &str) -> AppResult<String> {
    let phone: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = phone.strip_prefix('+').unwrap_or("");
    if digits.len() < 8 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "phone must use the format +33612345678".to_string(),
        ));
    }
    Ok(phone)
}
