//! ProductFeed entity model
//!
//! This module contains the SeaORM entity model for the product_feeds table,
//! which tracks feed upload targets registered with the remote catalog
//! provider for a catalog.

use super::catalog::Entity as Catalog;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// ProductFeed entity representing a named upload target for a catalog
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "product_feeds")]
pub struct Model {
    /// Unique identifier for the feed (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Catalog this feed belongs to
    pub catalog_id: Uuid,

    /// Feed identifier on the remote provider
    pub remote_feed_id: String,

    /// Feed display name
    pub name: String,

    /// Timestamp when the feed was created
    pub created_at: DateTimeWithTimeZone,
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
