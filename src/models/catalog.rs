//! Catalog entity model
//!
//! This module contains the SeaORM entity model for the catalogs table,
//! which mirrors one remote catalog resource per row. A catalog is owned by
//! the channel app it was discovered under and may be linked to the
//! e-commerce app whose products feed it.

use super::app::Entity as App;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Catalog entity representing a local mirror of a remote catalog
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "catalogs")]
pub struct Model {
    /// Unique identifier for the catalog (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning channel app identifier
    pub app_id: Uuid,

    /// Catalog identifier on the remote provider (unique per owning app)
    pub remote_id: String,

    /// Display name reported by the provider
    pub name: String,

    /// Provider catalog category/vertical
    pub category: Option<String>,

    /// E-commerce app this catalog is linked to, once connected
    pub commerce_app_id: Option<Uuid>,

    /// Timestamp when the catalog was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the catalog was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "App",
        from = "Column::AppId",
        to = "super::app::Column::Id"
    )]
    App,
    #[sea_orm(has_many = "super::product_feed::Entity")]
    Feeds,
}

impl Related<App> for Entity {
    fn to() -> RelationDef {
        Relation::App.def()
    }
}

impl Related<super::product_feed::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feeds.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
