//! UploadProduct repository for database operations
//!
//! This module provides the UploadProductRepository struct which encapsulates
//! SeaORM operations for the upload_products table. All status transitions
//! are conditional bulk updates scoped by explicit id sets and an expected
//! prior status, so concurrent workers never silently overwrite each other.

use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::upload_product::{self, Entity as UploadProduct, UploadStatus};

/// One product row to stage for upload.
#[derive(Debug, Clone)]
pub struct StagedProduct {
    /// Remote product identifier in `<sku>#<seller>` form
    pub remote_product_id: String,
    /// Pre-rendered feed row
    pub data: String,
}

/// Repository for upload product database operations
#[derive(Debug, Clone)]
pub struct UploadProductRepository {
    pub db: Arc<DatabaseConnection>,
}

impl UploadProductRepository {
    /// Creates a new UploadProductRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Atomically claims up to `batch_size` pending rows for a catalog.
    ///
    /// Selected rows transition pending -> processing inside one transaction
    /// and are returned oldest-modified-first. An empty result means the
    /// catalog has no pending rows left.
    pub async fn claim_pending_batch(
        &self,
        catalog_id: Uuid,
        batch_size: u64,
    ) -> Result<Vec<upload_product::Model>> {
        let txn = self.db.begin().await?;

        let ids = UploadProduct::find()
            .select_only()
            .column(upload_product::Column::Id)
            .filter(upload_product::Column::CatalogId.eq(catalog_id))
            .filter(upload_product::Column::Status.eq(UploadStatus::Pending.as_str()))
            .order_by_asc(upload_product::Column::ModifiedOn)
            .limit(Some(batch_size))
            .into_tuple::<Uuid>()
            .all(&txn)
            .await?;

        if ids.is_empty() {
            txn.commit().await?;
            return Ok(Vec::new());
        }

        UploadProduct::update_many()
            .col_expr(
                upload_product::Column::Status,
                Expr::value(UploadStatus::Processing.as_str()),
            )
            .filter(upload_product::Column::Id.is_in(ids.clone()))
            .filter(upload_product::Column::Status.eq(UploadStatus::Pending.as_str()))
            .exec(&txn)
            .await?;

        let claimed = UploadProduct::find()
            .filter(upload_product::Column::Id.is_in(ids))
            .filter(upload_product::Column::Status.eq(UploadStatus::Processing.as_str()))
            .order_by_asc(upload_product::Column::ModifiedOn)
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(claimed)
    }

    /// Marks processing rows as successfully sent
    pub async fn mark_success(&self, catalog_id: Uuid, remote_ids: &[String]) -> Result<u64> {
        self.transition(catalog_id, remote_ids, UploadStatus::Success)
            .await
    }

    /// Marks processing rows as failed
    pub async fn mark_error(&self, catalog_id: Uuid, remote_ids: &[String]) -> Result<u64> {
        self.transition(catalog_id, remote_ids, UploadStatus::Error)
            .await
    }

    async fn transition(
        &self,
        catalog_id: Uuid,
        remote_ids: &[String],
        to: UploadStatus,
    ) -> Result<u64> {
        if remote_ids.is_empty() {
            return Ok(0);
        }

        let result = UploadProduct::update_many()
            .col_expr(upload_product::Column::Status, Expr::value(to.as_str()))
            .filter(upload_product::Column::CatalogId.eq(catalog_id))
            .filter(upload_product::Column::RemoteProductId.is_in(remote_ids.iter().cloned()))
            .filter(upload_product::Column::Status.eq(UploadStatus::Processing.as_str()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Stages product rows as pending, upserting on `(catalog, remote product id)`.
    ///
    /// Re-staging an existing row is the external resync trigger: it rewrites
    /// the feed row, resets the status to pending, and touches modified_on.
    pub async fn stage(&self, catalog_id: Uuid, products: Vec<StagedProduct>) -> Result<u64> {
        if products.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let count = products.len() as u64;
        let rows = products.into_iter().map(|product| upload_product::ActiveModel {
            id: Set(Uuid::new_v4()),
            catalog_id: Set(catalog_id),
            remote_product_id: Set(product.remote_product_id),
            data: Set(product.data),
            status: Set(UploadStatus::Pending.as_str().to_string()),
            modified_on: Set(now.into()),
        });

        UploadProduct::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    upload_product::Column::CatalogId,
                    upload_product::Column::RemoteProductId,
                ])
                .update_columns([
                    upload_product::Column::Data,
                    upload_product::Column::Status,
                    upload_product::Column::ModifiedOn,
                ])
                .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        Ok(count)
    }

    /// Counts the rows of one catalog currently in `status`
    pub async fn count_with_status(&self, catalog_id: Uuid, status: UploadStatus) -> Result<u64> {
        Ok(UploadProduct::find()
            .filter(upload_product::Column::CatalogId.eq(catalog_id))
            .filter(upload_product::Column::Status.eq(status.as_str()))
            .count(&*self.db)
            .await?)
    }
}
