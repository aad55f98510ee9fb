//! SyncLock entity model
//!
//! This module contains the SeaORM entity model for the sync_locks table,
//! which backs the distributed lock primitive: one row per held key with
//! holder identity, diagnostic payload, and TTL expiry.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// SyncLock entity representing one held lock key
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_locks")]
pub struct Model {
    /// Lock key (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,

    /// Opaque holder identity, checked on renew and release
    pub holder: String,

    /// Diagnostic payload attached by the holder
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Option<JsonValue>,

    /// Timestamp when the lock was acquired
    pub acquired_at: DateTimeWithTimeZone,

    /// Timestamp when holdership lapses unless renewed
    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
