//! UploadLog repository for database operations
//!
//! This module provides the UploadLogRepository struct which appends to the
//! product_upload_logs audit table. The table is append-only; there are no
//! update or delete operations here on purpose.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::product_upload_log::{self, Entity as ProductUploadLog};

/// Repository for the append-only product upload audit log
#[derive(Debug, Clone)]
pub struct UploadLogRepository {
    pub db: Arc<DatabaseConnection>,
}

impl UploadLogRepository {
    /// Creates a new UploadLogRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Appends one audit row for a successfully sent SKU
    pub async fn append(&self, sku_id: i64, app_id: Uuid) -> Result<()> {
        let record = product_upload_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku_id: Set(sku_id),
            app_id: Set(app_id),
            created_at: Set(Utc::now().into()),
        };

        record.insert(&*self.db).await?;
        Ok(())
    }

    /// Counts audit rows for one app
    pub async fn count_for_app(&self, app_id: Uuid) -> Result<u64> {
        Ok(ProductUploadLog::find()
            .filter(product_upload_log::Column::AppId.eq(app_id))
            .count(&*self.db)
            .await?)
    }
}
