//! Named id sequences
//!
//! Record ids are a monotonic sequence value with a fixed type suffix appended
//! in decimal: the 7th department becomes `703`.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{DatabaseTransaction, EntityTrait, Set};

use crate::entity::id_sequence;
use crate::error::{AppError, AppResult};

pub const USER_SEQUENCE: &str = "user";
pub const LEGAL_ENTITY_SEQUENCE: &str = "legal_entity";
pub const DEPARTMENT_SEQUENCE: &str = "department";

pub const USER_SUFFIX: &str = "01";
pub const LEGAL_ENTITY_SUFFIX: &str = "02";
pub const DEPARTMENT_SUFFIX: &str = "03";

/// Source of monotonic values, consumed inside the caller's transaction
#[async_trait]
pub trait SequenceGenerator: Send + Sync {
    async fn next_value(&self, txn: &DatabaseTransaction, name: &str) -> AppResult<i64>;
}

/// Sequence backed by the `dept_id_sequence` table
#[derive(Clone, Copy, Debug, Default)]
pub struct DbSequence;

#[async_trait]
impl SequenceGenerator for DbSequence {
    async fn next_value(&self, txn: &DatabaseTransaction, name: &str) -> AppResult<i64> {
        // One statement for first use and increment; the row stays locked
        // until the transaction ends
        id_sequence::Entity::insert(id_sequence::ActiveModel {
            name: Set(name.to_string()),
            last: Set(1),
        })
        .on_conflict(
            OnConflict::column(id_sequence::Column::Name)
                .value(
                    id_sequence::Column::Last,
                    Expr::col((id_sequence::Entity, id_sequence::Column::Last)).add(1),
                )
                .to_owned(),
        )
        .exec_without_returning(txn)
        .await?;

        let row = id_sequence::Entity::find_by_id(name.to_string())
            .one(txn)
            .await?
            .ok_or_else(|| AppError::SequenceExhausted(format!("sequence '{}' vanished", name)))?;
        Ok(row.last)
    }
}

/// Append `suffix` to `value` in decimal
pub fn id_with_suffix(value: i64, suffix: &str) -> AppResult<i64> {
    format!("{}{}", value, suffix)
        .parse::<i64>()
        .map_err(|_| AppError::SequenceExhausted(format!("{}{} does not fit an id", value, suffix)))
}

/// Next value of `name` with `suffix` appended
pub async fn next_id(
    sequence: &dyn SequenceGenerator,
    txn: &DatabaseTransaction,
    name: &str,
    suffix: &str,
) -> AppResult<i64> {
    let value = sequence.next_value(txn, name).await?;
    if value < 1 {
        return Err(AppError::SequenceExhausted(format!(
            "sequence '{}' returned {}",
            name, value
        )));
    }
    id_with_suffix(value, suffix)
}
