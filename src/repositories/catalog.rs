//! Catalog repository for database operations
//!
//! This module provides the CatalogRepository struct which encapsulates
//! SeaORM operations for the catalogs table: remote-id lookups used by the
//! reconciler diff and the link operations used by the orchestrator.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::catalog::{self, Entity as Catalog};

/// Repository for catalog database operations
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pub db: Arc<DatabaseConnection>,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a catalog by its ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<catalog::Model>> {
        Ok(Catalog::find_by_id(id).one(&*self.db).await?)
    }

    /// Finds a catalog by its unique `(owning app, remote id)` pair
    pub async fn find_by_remote_id(
        &self,
        app_id: Uuid,
        remote_id: &str,
    ) -> Result<Option<catalog::Model>> {
        Ok(Catalog::find()
            .filter(catalog::Column::AppId.eq(app_id))
            .filter(catalog::Column::RemoteId.eq(remote_id))
            .one(&*self.db)
            .await?)
    }

    /// Lists the remote catalog ids stored locally for one owning app
    pub async fn list_remote_ids(&self, app_id: Uuid) -> Result<Vec<String>> {
        Ok(Catalog::find()
            .select_only()
            .column(catalog::Column::RemoteId)
            .filter(catalog::Column::AppId.eq(app_id))
            .into_tuple::<String>()
            .all(&*self.db)
            .await?)
    }

    /// First catalog linked to the given commerce app, oldest first
    pub async fn find_first_by_commerce_app(
        &self,
        commerce_app_id: Uuid,
    ) -> Result<Option<catalog::Model>> {
        Ok(Catalog::find()
            .filter(catalog::Column::CommerceAppId.eq(commerce_app_id))
            .order_by_asc(catalog::Column::CreatedAt)
            .one(&*self.db)
            .await?)
    }

    /// Creates a new catalog record
    pub async fn create(&self, record: catalog::ActiveModel) -> Result<catalog::Model> {
        let id = record
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("catalog id must be set"))?;

        record.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = Catalog::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("catalog not persisted"))
    }

    /// Deletes the catalogs of one owning app whose remote ids are in `remote_ids`
    pub async fn delete_by_remote_ids(&self, app_id: Uuid, remote_ids: &[String]) -> Result<u64> {
        if remote_ids.is_empty() {
            return Ok(0);
        }

        let result = Catalog::delete_many()
            .filter(catalog::Column::AppId.eq(app_id))
            .filter(catalog::Column::RemoteId.is_in(remote_ids.iter().cloned()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Links a catalog to a commerce app unless it is already linked.
    ///
    /// Returns `true` when the link was written.
    pub async fn link_commerce_app(&self, catalog_id: Uuid, commerce_app_id: Uuid) -> Result<bool> {
        let existing = Catalog::find_by_id(catalog_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Catalog with ID '{}' not found", catalog_id))?;

        if existing.commerce_app_id.is_some() {
            return Ok(false);
        }

        let mut model: catalog::ActiveModel = existing.into();
        model.commerce_app_id = Set(Some(commerce_app_id));
        model.updated_at = Set(Utc::now().into());
        model.update(&*self.db).await?;

        Ok(true)
    }
}
