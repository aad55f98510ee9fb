//! App repository for database operations
//!
//! This module provides the AppRepository struct which encapsulates SeaORM
//! operations for the apps table, including typed configuration updates.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::app::{self, Entity as App};
use crate::settings::AppSettings;

/// Repository for app database operations
#[derive(Debug, Clone)]
pub struct AppRepository {
    pub db: Arc<DatabaseConnection>,
}

impl AppRepository {
    /// Creates a new AppRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds an app by its ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<app::Model>> {
        Ok(App::find_by_id(id).one(&*self.db).await?)
    }

    /// Finds an app by ID, requiring a specific provider code
    pub async fn find_by_id_and_code(&self, id: Uuid, code: &str) -> Result<Option<app::Model>> {
        Ok(App::find_by_id(id)
            .filter(app::Column::Code.eq(code))
            .one(&*self.db)
            .await?)
    }

    /// Lists all apps of one provider code, oldest first
    pub async fn list_by_code(&self, code: &str) -> Result<Vec<app::Model>> {
        Ok(App::find()
            .filter(app::Column::Code.eq(code))
            .order_by_asc(app::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Creates a new app record
    pub async fn create(&self, record: app::ActiveModel) -> Result<app::Model> {
        let id = record
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("app id must be set"))?;

        record.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = App::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("app not persisted"))
    }

    /// Persists updated settings into the app's configuration map
    pub async fn save_settings(&self, id: Uuid, settings: &AppSettings) -> Result<app::Model> {
        let existing = App::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("App with ID '{}' not found", id))?;

        let mut model: app::ActiveModel = existing.into();
        model.config = Set(settings.to_config());
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }
}
