//! # Task Dispatch
//!
//! The asynchronous task-dispatch boundary: named jobs with a structured
//! payload submitted to named queues. Submission is fire-and-forget and
//! at-least-once from the caller's perspective. The production dispatcher
//! enqueues a durable dispatched_jobs row for the background executor to
//! claim.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::dispatched_job;
use crate::settings::ApiCredentials;

/// Queue for first and seller-scoped product synchronization jobs.
pub const QUEUE_FIRST_SYNC: &str = "product-first-sync";
/// Queue for upload worker jobs.
pub const QUEUE_UPLOAD: &str = "product-upload";

/// Job status values used in dispatched_jobs rows.
pub const STATUS_QUEUED: &str = "queued";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_SUCCEEDED: &str = "succeeded";
pub const STATUS_FAILED: &str = "failed";

/// Structured payload of a dispatched job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum JobPayload {
    /// Full catalog population, optionally scoped to sellers.
    InsertProducts {
        credentials: ApiCredentials,
        catalog_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sellers: Option<Vec<String>>,
    },
    /// Incremental insertion scoped to a seller set.
    InsertProductsBySellers {
        credentials: ApiCredentials,
        catalog_id: Uuid,
        sellers: Vec<String>,
    },
    /// Drain the pending upload rows of one commerce app.
    UploadProducts { app_id: Uuid },
}

impl JobPayload {
    /// Job name recorded in the queue row.
    pub fn name(&self) -> &'static str {
        match self {
            JobPayload::InsertProducts { .. } => "insert_products",
            JobPayload::InsertProductsBySellers { .. } => "insert_products_by_sellers",
            JobPayload::UploadProducts { .. } => "upload_products",
        }
    }

    /// Queue the job is submitted to.
    pub fn queue(&self) -> &'static str {
        match self {
            JobPayload::InsertProducts { .. } | JobPayload::InsertProductsBySellers { .. } => {
                QUEUE_FIRST_SYNC
            }
            JobPayload::UploadProducts { .. } => QUEUE_UPLOAD,
        }
    }
}

/// Task-dispatch boundary.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Submits a job for deferred execution. Fire-and-forget: the dispatcher
    /// does not wait for the job to run.
    async fn submit(&self, job: JobPayload) -> Result<()>;
}

/// Dispatcher backed by the dispatched_jobs queue table.
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    db: Arc<DatabaseConnection>,
}

impl QueueDispatcher {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskDispatcher for QueueDispatcher {
    async fn submit(&self, job: JobPayload) -> Result<()> {
        let now = Utc::now();
        let name = job.name();
        let queue = job.queue();
        let payload = serde_json::to_value(&job)?;

        let row = dispatched_job::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            queue: Set(queue.to_string()),
            payload: Set(payload),
            status: Set(STATUS_QUEUED.to_string()),
            attempts: Set(0),
            scheduled_at: Set(now.into()),
            started_at: Set(None),
            finished_at: Set(None),
            error: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let inserted = row.insert(&*self.db).await?;

        info!(job_id = %inserted.id, name, queue, "Job dispatched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> ApiCredentials {
        ApiCredentials {
            domain: "store.example".to_string(),
            app_key: "key".to_string(),
            app_token: "token".to_string(),
        }
    }

    #[test]
    fn payload_roundtrips_through_json() {
        let job = JobPayload::InsertProductsBySellers {
            credentials: credentials(),
            catalog_id: Uuid::new_v4(),
            sellers: vec!["s1".to_string(), "s2".to_string()],
        };

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["name"], "insert_products_by_sellers");

        let parsed: JobPayload = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, job);
    }

    #[test]
    fn jobs_route_to_their_queues() {
        let insert = JobPayload::InsertProducts {
            credentials: credentials(),
            catalog_id: Uuid::new_v4(),
            sellers: None,
        };
        let upload = JobPayload::UploadProducts {
            app_id: Uuid::new_v4(),
        };

        assert_eq!(insert.queue(), QUEUE_FIRST_SYNC);
        assert_eq!(insert.name(), "insert_products");
        assert_eq!(upload.queue(), QUEUE_UPLOAD);
        assert_eq!(upload.name(), "upload_products");
    }
}
