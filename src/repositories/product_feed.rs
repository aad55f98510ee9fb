//! ProductFeed repository for database operations
//!
//! This module provides the ProductFeedRepository struct which encapsulates
//! SeaORM operations for the product_feeds table.

use anyhow::{Result, anyhow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::product_feed::{self, Entity as ProductFeed};

/// Repository for product feed database operations
#[derive(Debug, Clone)]
pub struct ProductFeedRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ProductFeedRepository {
    /// Creates a new ProductFeedRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// First feed registered for a catalog, oldest first
    pub async fn find_first_for_catalog(
        &self,
        catalog_id: Uuid,
    ) -> Result<Option<product_feed::Model>> {
        Ok(ProductFeed::find()
            .filter(product_feed::Column::CatalogId.eq(catalog_id))
            .order_by_asc(product_feed::Column::CreatedAt)
            .one(&*self.db)
            .await?)
    }

    /// Creates a new feed record
    pub async fn create(
        &self,
        catalog_id: Uuid,
        remote_feed_id: &str,
        name: &str,
    ) -> Result<product_feed::Model> {
        let id = Uuid::new_v4();
        let record = product_feed::ActiveModel {
            id: Set(id),
            catalog_id: Set(catalog_id),
            remote_feed_id: Set(remote_feed_id.to_string()),
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        record.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = ProductFeed::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("product feed not persisted"))
    }

    /// Deletes every feed linked to a catalog, returning how many were removed
    pub async fn delete_for_catalog(&self, catalog_id: Uuid) -> Result<u64> {
        let result = ProductFeed::delete_many()
            .filter(product_feed::Column::CatalogId.eq(catalog_id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
