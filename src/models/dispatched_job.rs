//! DispatchedJob entity model
//!
//! This module contains the SeaORM entity model for the dispatched_jobs
//! table, the durable queue behind the task-dispatch boundary. Delivery is
//! at-least-once: a job row is claimed by transitioning queued -> running
//! and finishes as succeeded or failed.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// DispatchedJob entity representing one queued unit of deferred work
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dispatched_jobs")]
pub struct Model {
    /// Unique identifier for the job (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Job name (e.g., insert_products, insert_products_by_sellers)
    pub name: String,

    /// Named queue the job was submitted to
    pub queue: String,

    /// Structured job payload
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: JsonValue,

    /// Current status of the job (queued, running, succeeded, failed)
    pub status: String,

    /// Executions attempted so far
    pub attempts: i32,

    /// Timestamp when the job becomes eligible to run
    pub scheduled_at: DateTimeWithTimeZone,

    /// When the executor claimed the job
    pub started_at: Option<DateTimeWithTimeZone>,

    /// When the run ended, in success or failure
    pub finished_at: Option<DateTimeWithTimeZone>,

    /// Failure details, recorded when the job ends up failed
    #[sea_orm(column_type = "JsonBinary")]
    pub error: Option<JsonValue>,

    /// Timestamp when the job was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the job was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
