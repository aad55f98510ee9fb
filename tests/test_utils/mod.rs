//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use catalog_sync::dispatch::{JobPayload, TaskDispatcher};
use catalog_sync::models::app::{CODE_CHANNEL, CODE_COMMERCE};
use catalog_sync::models::{app, catalog, product_feed, upload_product};

/// Creates a fresh in-memory database with migrations applied.
pub async fn setup_test_db() -> Result<Arc<DatabaseConnection>> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(Arc::new(db))
}

/// Inserts a channel app with the given config and notify object id.
pub async fn insert_channel_app(
    db: &DatabaseConnection,
    config: JsonValue,
    notify_object_id: Option<Uuid>,
) -> Result<app::Model> {
    let now = Utc::now();
    let record = app::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(CODE_CHANNEL.to_string()),
        config: Set(config),
        notify_object_id: Set(notify_object_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    Ok(record.insert(db).await?)
}

/// Inserts a commerce app with the given config.
pub async fn insert_commerce_app(db: &DatabaseConnection, config: JsonValue) -> Result<app::Model> {
    let now = Utc::now();
    let record = app::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(CODE_COMMERCE.to_string()),
        config: Set(config),
        notify_object_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    Ok(record.insert(db).await?)
}

/// Inserts a catalog owned by `app_id`, optionally linked to a commerce app.
pub async fn insert_catalog(
    db: &DatabaseConnection,
    app_id: Uuid,
    remote_id: &str,
    commerce_app_id: Option<Uuid>,
) -> Result<catalog::Model> {
    let now = Utc::now();
    let record = catalog::ActiveModel {
        id: Set(Uuid::new_v4()),
        app_id: Set(app_id),
        remote_id: Set(remote_id.to_string()),
        name: Set(format!("Catalog {remote_id}")),
        category: Set(Some("commerce".to_string())),
        commerce_app_id: Set(commerce_app_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    Ok(record.insert(db).await?)
}

/// Inserts a product feed for a catalog.
pub async fn insert_feed(
    db: &DatabaseConnection,
    catalog_id: Uuid,
    remote_feed_id: &str,
) -> Result<product_feed::Model> {
    let record = product_feed::ActiveModel {
        id: Set(Uuid::new_v4()),
        catalog_id: Set(catalog_id),
        remote_feed_id: Set(remote_feed_id.to_string()),
        name: Set("Product feed".to_string()),
        created_at: Set(Utc::now().into()),
    };
    Ok(record.insert(db).await?)
}

/// Inserts a pending upload row with an explicit modified_on offset so batch
/// ordering is deterministic.
pub async fn insert_pending_product(
    db: &DatabaseConnection,
    catalog_id: Uuid,
    remote_product_id: &str,
    modified_offset_secs: i64,
) -> Result<upload_product::Model> {
    let record = upload_product::ActiveModel {
        id: Set(Uuid::new_v4()),
        catalog_id: Set(catalog_id),
        remote_product_id: Set(remote_product_id.to_string()),
        data: Set(format!("{remote_product_id},Product,desc,in stock,active,new,10 BRL,link,img,Acme,")),
        status: Set("pending".to_string()),
        modified_on: Set((Utc::now() + chrono::Duration::seconds(modified_offset_secs)).into()),
    };
    Ok(record.insert(db).await?)
}

/// Dispatcher that records submitted jobs instead of enqueuing them.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    pub jobs: Mutex<Vec<JobPayload>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn submitted(&self) -> Vec<JobPayload> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskDispatcher for RecordingDispatcher {
    async fn submit(&self, job: JobPayload) -> Result<()> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

/// Commerce app config with complete credentials pointing at a channel app.
pub fn commerce_config(channel_app_id: Uuid, domain: &str) -> JsonValue {
    serde_json::json!({
        "channel_app_id": channel_app_id,
        "api_credentials": {
            "domain": domain,
            "app_key": "test-key",
            "app_token": "test-token"
        },
        "store_domain": domain,
        "use_sync_v2": true,
        "initial_sync_completed": false,
        "connected_catalog": false
    })
}

/// Channel app config with both provider identities present.
pub fn channel_config(business_id: &str, waba_id: &str) -> JsonValue {
    serde_json::json!({
        "wa_business_id": business_id,
        "wa_waba_id": waba_id
    })
}
