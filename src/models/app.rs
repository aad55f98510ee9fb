//! App entity model
//!
//! This module contains the SeaORM entity model for the apps table, which
//! stores one row per tenant integration instance (an e-commerce store
//! connection or a messaging catalog connection).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Provider code for e-commerce store connections.
pub const CODE_COMMERCE: &str = "commerce";
/// Provider code for messaging catalog connections.
pub const CODE_CHANNEL: &str = "channel";

/// App entity representing one tenant integration instance
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "apps")]
pub struct Model {
    /// Unique identifier for the app (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Provider code ("commerce" or "channel")
    pub code: String,

    /// Free-form configuration map (credentials, flags, identities)
    #[sea_orm(column_type = "JsonBinary")]
    pub config: JsonValue,

    /// Object identifier the downstream notification consumer is keyed by
    pub notify_object_id: Option<Uuid>,

    /// Timestamp when the app was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the app was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::catalog::Entity")]
    Catalogs,
}

impl Related<super::catalog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Catalogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
