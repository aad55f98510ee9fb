//! UploadProduct entity model
//!
//! This module contains the SeaORM entity model for the upload_products
//! table, which holds one row per (product, catalog) pending or attempted
//! upload. Status transitions within one batch cycle are monotone:
//! pending -> processing -> success | error. A row only returns to pending
//! through an external resync trigger.

use super::catalog::Entity as Catalog;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Upload state of a product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Processing => "processing",
            UploadStatus::Success => "success",
            UploadStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UploadStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(UploadStatus::Pending),
            "processing" => Ok(UploadStatus::Processing),
            "success" => Ok(UploadStatus::Success),
            "error" => Ok(UploadStatus::Error),
            other => Err(format!("unknown upload status: {other}")),
        }
    }
}

/// UploadProduct entity representing one (product, catalog) upload row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "upload_products")]
pub struct Model {
    /// Unique identifier for the row (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Catalog this product upload targets
    pub catalog_id: Uuid,

    /// Remote product identifier in `<sku>#<seller>` form
    pub remote_product_id: String,

    /// Pre-rendered feed row for this product
    pub data: String,

    /// Upload status (pending, processing, success, error)
    pub status: String,

    /// Last-modified timestamp, drives oldest-first batch selection
    pub modified_on: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Catalog",
        from = "Column::CatalogId",
        to = "super::catalog::Column::Id"
    )]
    Catalog,
}

impl Related<Catalog> for Entity {
    fn to() -> RelationDef {
        Relation::Catalog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::UploadStatus;
    use std::str::FromStr;

    #[test]
    fn upload_status_roundtrips() {
        for status in [
            UploadStatus::Pending,
            UploadStatus::Processing,
            UploadStatus::Success,
            UploadStatus::Error,
        ] {
            assert_eq!(UploadStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn upload_status_rejects_unknown() {
        assert!(UploadStatus::from_str("queued").is_err());
    }
}
