//! # Distributed Locks
//!
//! Process-wide mutual exclusion keyed by string, backed by the sync_locks
//! table. Acquisition is an atomic set-if-not-exists with TTL: an INSERT
//! wins the key, a unique violation means the key is held, and a lapsed row
//! may be taken over with a conditional UPDATE. Long-running holders must
//! renew periodically; a lapsed TTL hands the key to the next caller.

use anyhow::Result;
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::sync_lock::{self, Entity as SyncLock};

/// Global lock key guarding catalog reconciliation passes.
pub const SYNC_CATALOGS_LOCK_KEY: &str = "sync-catalogs-lock";

/// Lock key for a seller-scoped synchronization of one app.
pub fn seller_sync_lock_key(app_id: Uuid) -> String {
    format!("sync-sellers:{app_id}")
}

/// Lock key gating the upload worker of one app.
pub fn upload_lock_key(app_id: Uuid) -> String {
    format!("upload:{app_id}")
}

/// Distributed lock service.
///
/// Each instance carries an opaque holder identity; renew and release only
/// act on rows this instance acquired.
#[derive(Debug, Clone)]
pub struct LockService {
    db: Arc<DatabaseConnection>,
    holder: String,
}

impl LockService {
    /// Creates a lock service with a fresh holder identity.
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            holder: Uuid::new_v4().to_string(),
        }
    }

    /// Creates a lock service with an explicit holder identity (useful for tests).
    pub fn with_holder(db: Arc<DatabaseConnection>, holder: impl Into<String>) -> Self {
        Self {
            db,
            holder: holder.into(),
        }
    }

    /// The holder identity written into acquired rows.
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Attempts to acquire `key` for `ttl_seconds`, without blocking.
    ///
    /// Returns `false` when another holder currently owns an unexpired row.
    /// An expired row is taken over in place.
    pub async fn acquire(
        &self,
        key: &str,
        ttl_seconds: u64,
        payload: Option<JsonValue>,
    ) -> Result<bool> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(ttl_seconds as i64);

        let row = sync_lock::ActiveModel {
            key: Set(key.to_string()),
            holder: Set(self.holder.clone()),
            payload: Set(payload.clone()),
            acquired_at: Set(now.into()),
            expires_at: Set(expires_at.into()),
        };

        match row.insert(&*self.db).await {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => {
                // The key is present; it is only ours if the previous
                // holdership has lapsed.
                let takeover = SyncLock::update_many()
                    .col_expr(sync_lock::Column::Holder, Expr::value(self.holder.clone()))
                    .col_expr(sync_lock::Column::Payload, Expr::value(payload))
                    .col_expr(sync_lock::Column::AcquiredAt, Expr::value(now))
                    .col_expr(sync_lock::Column::ExpiresAt, Expr::value(expires_at))
                    .filter(sync_lock::Column::Key.eq(key))
                    .filter(sync_lock::Column::ExpiresAt.lte(now))
                    .exec(&*self.db)
                    .await?;

                Ok(takeover.rows_affected == 1)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Extends the TTL of a key this instance still holds.
    ///
    /// Returns `false` when holdership was lost (expired and taken over, or
    /// released elsewhere).
    pub async fn renew(&self, key: &str, ttl_seconds: u64) -> Result<bool> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(ttl_seconds as i64);

        let renewed = SyncLock::update_many()
            .col_expr(sync_lock::Column::ExpiresAt, Expr::value(expires_at))
            .filter(sync_lock::Column::Key.eq(key))
            .filter(sync_lock::Column::Holder.eq(self.holder.as_str()))
            .filter(sync_lock::Column::ExpiresAt.gt(now))
            .exec(&*self.db)
            .await?;

        Ok(renewed.rows_affected == 1)
    }

    /// Releases a key held by this instance. Releasing a key held by someone
    /// else (or not held at all) is a no-op.
    pub async fn release(&self, key: &str) -> Result<()> {
        SyncLock::delete_many()
            .filter(sync_lock::Column::Key.eq(key))
            .filter(sync_lock::Column::Holder.eq(self.holder.as_str()))
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    /// Reads the current lock row for diagnostics, if any.
    pub async fn read(&self, key: &str) -> Result<Option<sync_lock::Model>> {
        Ok(SyncLock::find_by_id(key.to_string()).one(&*self.db).await?)
    }

    /// Returns true when `key` is currently held by any holder.
    pub async fn is_held(&self, key: &str) -> Result<bool> {
        let now = Utc::now();
        let row = SyncLock::find_by_id(key.to_string()).one(&*self.db).await?;
        Ok(row.is_some_and(|lock| lock.expires_at > now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use serde_json::json;

    async fn setup_db() -> Arc<DatabaseConnection> {
        let db = sea_orm::Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        Migrator::up(&db, None).await.expect("migrations apply");
        Arc::new(db)
    }

    #[tokio::test]
    async fn acquire_is_mutually_exclusive() {
        let db = setup_db().await;
        let first = LockService::with_holder(db.clone(), "worker-a");
        let second = LockService::with_holder(db.clone(), "worker-b");

        assert!(first.acquire("k", 60, None).await.unwrap());
        assert!(!second.acquire("k", 60, None).await.unwrap());

        // Releasing frees the key for the other holder
        first.release("k").await.unwrap();
        assert!(second.acquire("k", 60, None).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_acquires_admit_one_holder() {
        let db = setup_db().await;
        let first = LockService::with_holder(db.clone(), "worker-a");
        let second = LockService::with_holder(db.clone(), "worker-b");

        let (a, b) = tokio::join!(first.acquire("k", 60, None), second.acquire("k", 60, None));
        let granted = [a.unwrap(), b.unwrap()];
        assert_eq!(granted.iter().filter(|held| **held).count(), 1);
    }

    #[tokio::test]
    async fn expired_lock_can_be_taken_over() {
        let db = setup_db().await;
        let stale = LockService::with_holder(db.clone(), "stale");
        let fresh = LockService::with_holder(db.clone(), "fresh");

        // TTL of zero lapses immediately
        assert!(stale.acquire("k", 0, None).await.unwrap());
        assert!(fresh.acquire("k", 60, None).await.unwrap());

        let row = fresh.read("k").await.unwrap().unwrap();
        assert_eq!(row.holder, "fresh");
    }

    #[tokio::test]
    async fn renew_extends_only_for_current_holder() {
        let db = setup_db().await;
        let holder = LockService::with_holder(db.clone(), "worker-a");
        let other = LockService::with_holder(db.clone(), "worker-b");

        assert!(holder.acquire("k", 60, None).await.unwrap());
        assert!(holder.renew("k", 120).await.unwrap());
        assert!(!other.renew("k", 120).await.unwrap());
    }

    #[tokio::test]
    async fn renew_after_expiry_reports_lost_holdership() {
        let db = setup_db().await;
        let holder = LockService::with_holder(db.clone(), "worker-a");

        assert!(holder.acquire("k", 0, None).await.unwrap());
        assert!(!holder.renew("k", 60).await.unwrap());
    }

    #[tokio::test]
    async fn read_exposes_payload_metadata() {
        let db = setup_db().await;
        let holder = LockService::with_holder(db.clone(), "worker-a");

        let payload = json!({"app_id": "a-1", "sellers": ["s1", "s2"]});
        assert!(holder.acquire("k", 60, Some(payload.clone())).await.unwrap());

        let row = holder.read("k").await.unwrap().unwrap();
        assert_eq!(row.payload, Some(payload));
        assert!(holder.is_held("k").await.unwrap());
    }

    #[tokio::test]
    async fn release_of_foreign_key_is_noop() {
        let db = setup_db().await;
        let holder = LockService::with_holder(db.clone(), "worker-a");
        let other = LockService::with_holder(db.clone(), "worker-b");

        assert!(holder.acquire("k", 60, None).await.unwrap());
        other.release("k").await.unwrap();
        assert!(holder.is_held("k").await.unwrap());
    }
}
