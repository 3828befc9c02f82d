//! Legal entity store
//!
//! Companies a client works for. A legal entity can be attached to any
//! number of departments; the links are maintained by the tree engine.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::entity::{legal_entity, legal_entity_department};
use crate::error::{AppError, AppResult, OptionExt};
use crate::sequence::{
    next_id, DbSequence, SequenceGenerator, LEGAL_ENTITY_SEQUENCE, LEGAL_ENTITY_SUFFIX,
};

pub const MAX_FULL_NAME_LEN: usize = 1024;
pub const MAX_SHORT_NAME_LEN: usize = 500;

const INN_RANGE: RangeInclusive<i64> = 1_000_000_000..=9_999_999_999;
const KPP_RANGE: RangeInclusive<i64> = 100_000_000..=999_999_999;

/// Fields accepted when creating a legal entity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLegalEntity {
    pub full_name: String,
    pub short_name: String,
    pub inn: i64,
    pub kpp: i64,
}

#[derive(Clone)]
pub struct LegalEntityStore {
    db: DatabaseConnection,
    sequence: Arc<dyn SequenceGenerator>,
}

impl LegalEntityStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_sequence(db, Arc::new(DbSequence))
    }

    pub fn with_sequence(db: DatabaseConnection, sequence: Arc<dyn SequenceGenerator>) -> Self {
        Self { db, sequence }
    }

    pub async fn create(&self, new: NewLegalEntity) -> AppResult<legal_entity::Model> {
        let full_name = validate_name("full name", &new.full_name, MAX_FULL_NAME_LEN)?;
        let short_name = validate_name("short name", &new.short_name, MAX_SHORT_NAME_LEN)?;
        check_range("INN", new.inn, &INN_RANGE)?;
        check_range("KPP", new.kpp, &KPP_RANGE)?;

        let txn = self.db.begin().await?;
        let id = next_id(&*self.sequence, &txn, LEGAL_ENTITY_SEQUENCE, LEGAL_ENTITY_SUFFIX).await?;
        let model = legal_entity::ActiveModel {
            id: Set(id),
            full_name: Set(full_name),
            short_name: Set(short_name),
            inn: Set(new.inn),
            kpp: Set(new.kpp),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        tracing::info!("Created legal entity {} '{}'", model.id, model.short_name);
        Ok(model)
    }

    pub async fn get(&self, id: i64) -> AppResult<legal_entity::Model> {
        legal_entity::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found(format!("legal entity {}", id))
    }

    /// All legal entities, oldest first
    pub async fn list(&self) -> AppResult<Vec<legal_entity::Model>> {
        Ok(legal_entity::Entity::find()
            .order_by_asc(legal_entity::Column::CreatedAt)
            .order_by_asc(legal_entity::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Departments the legal entity is attached to
    pub async fn departments(&self, id: i64) -> AppResult<Vec<i64>> {
        let txn = self.db.begin().await?;
        legal_entity::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_not_found(format!("legal entity {}", id))?;
        let ids = legal_entity_department::Entity::find()
            .select_only()
            .column(legal_entity_department::Column::DepartmentId)
            .filter(legal_entity_department::Column::LegalEntityId.eq(id))
            .order_by_asc(legal_entity_department::Column::DepartmentId)
            .into_tuple::<i64>()
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(ids)
    }

    /// Delete a legal entity and its department links
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let txn = self.db.begin().await?;
        legal_entity_department::Entity::delete_many()
            .filter(legal_entity_department::Column::LegalEntityId.eq(id))
            .exec(&txn)
            .await?;
        let result = legal_entity::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("legal entity {}", id)));
        }
        txn.commit().await?;
        tracing::info!("Deleted legal entity {}", id);
        Ok(())
    }
}

fn validate_name(field: &str, value: &str, max: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be 1 to {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

fn check_range(field: &str, value: i64, range: &RangeInclusive<i64>) -> AppResult<()> {
    if !range.contains(&value) {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}",
            field,
            range.start(),
            range.end()
        )));
    }
    Ok(())
}
