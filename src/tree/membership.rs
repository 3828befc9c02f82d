//! Client membership in departments and legal entity links

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use super::{find_node, Locked, TreeEngine};
use crate::entity::{client, client_department, legal_entity, legal_entity_department};
use crate::error::{AppError, AppResult, OptionExt};

impl TreeEngine {
    /// Link a client to a department; an existing link is returned unchanged
    pub async fn add_member(
        &self,
        client_id: i64,
        department_id: i64,
    ) -> AppResult<client_department::Model> {
        // Holding the tree lock keeps a concurrent subtree delete from
        // leaving this row behind
        let Locked { _guard, txn, .. } = self.begin_locked(false, &[department_id]).await?;

        client::Entity::find_by_id(client_id)
            .one(&txn)
            .await?
            .ok_or_not_found(format!("client {}", client_id))?;

        let existing = client_department::Entity::find()
            .filter(client_department::Column::ClientId.eq(client_id))
            .filter(client_department::Column::DepartmentId.eq(department_id))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let membership = client_department::ActiveModel {
            client_id: Set(client_id),
            department_id: Set(department_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        tracing::info!("Added client {} to department {}", client_id, department_id);
        Ok(membership)
    }

    pub async fn remove_member(&self, client_id: i64, department_id: i64) -> AppResult<()> {
        let result = client_department::Entity::delete_many()
            .filter(client_department::Column::ClientId.eq(client_id))
            .filter(client_department::Column::DepartmentId.eq(department_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "client {} in department {}",
                client_id, department_id
            )));
        }
        tracing::info!("Removed client {} from department {}", client_id, department_id);
        Ok(())
    }

    /// Clients linked directly to `department_id`
    pub async fn members(&self, department_id: i64) -> AppResult<Vec<i64>> {
        let txn = self.begin_read().await?;
        find_node(&txn, department_id).await?;
        let ids = client_department::Entity::find()
            .select_only()
            .column(client_department::Column::ClientId)
            .distinct()
            .filter(client_department::Column::DepartmentId.eq(department_id))
            .order_by_asc(client_department::Column::ClientId)
            .into_tuple::<i64>()
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(ids)
    }

    /// Attach a legal entity to a department; an existing link is returned
    /// unchanged
    pub async fn link_legal_entity(
        &self,
        legal_entity_id: i64,
        department_id: i64,
    ) -> AppResult<legal_entity_department::Model> {
        let Locked { _guard, txn, .. } = self.begin_locked(false, &[department_id]).await?;

        legal_entity::Entity::find_by_id(legal_entity_id)
            .one(&txn)
            .await?
            .ok_or_not_found(format!("legal entity {}", legal_entity_id))?;

        let existing = legal_entity_department::Entity::find()
            .filter(legal_entity_department::Column::LegalEntityId.eq(legal_entity_id))
            .filter(legal_entity_department::Column::DepartmentId.eq(department_id))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let link = legal_entity_department::ActiveModel {
            legal_entity_id: Set(legal_entity_id),
            department_id: Set(department_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        tracing::info!("Linked legal entity {} to department {}", legal_entity_id, department_id);
        Ok(link)
    }

    pub async fn unlink_legal_entity(&self, legal_entity_id: i64, department_id: i64) -> AppResult<()> {
        let result = legal_entity_department::Entity::delete_many()
            .filter(legal_entity_department::Column::LegalEntityId.eq(legal_entity_id))
            .filter(legal_entity_department::Column::DepartmentId.eq(department_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "legal entity {} in department {}",
                legal_entity_id, department_id
            )));
        }
        tracing::info!("Unlinked legal entity {} from department {}", legal_entity_id, department_id);
        Ok(())
    }

    /// Legal entities attached directly to `department_id`
    pub async fn legal_entities(&self, department_id: i64) -> AppResult<Vec<i64>> {
        let txn = self.begin_read().await?;
        find_node(&txn, department_id).await?;
        let ids = legal_entity_department::Entity::find()
            .select_only()
            .column(legal_entity_department::Column::LegalEntityId)
            .distinct()
            .filter(legal_entity_department::Column::DepartmentId.eq(department_id))
            .order_by_asc(legal_entity_department::Column::LegalEntityId)
            .into_tuple::<i64>()
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(ids)
    }
}
