//! ProductUploadLog entity model
//!
//! This module contains the SeaORM entity model for the product_upload_logs
//! table, an append-only audit of every SKU successfully sent to the remote
//! catalog provider. Rows are never updated or deleted by the engine.

use super::app::Entity as App;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// ProductUploadLog entity representing one successfully sent SKU
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "product_upload_logs")]
pub struct Model {
    /// Unique identifier for the log row (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Numeric SKU extracted from the remote product identifier
    pub sku_id: i64,

    /// E-commerce app the product originated from
    pub app_id: Uuid,

    /// Timestamp when the log row was appended
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "App",
        from = "Column::AppId",
        to = "super::app::Column::Id"
    )]
    App,
}

impl Related<App> for Entity {
    fn to() -> RelationDef {
        Relation::App.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
