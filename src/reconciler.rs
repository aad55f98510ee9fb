//! # Catalog Reconciler
//!
//! Keeps local catalog rows aligned with the remote provider's listing for
//! every channel app, and pushes the full listing to the downstream channel
//! consumer on every pass. One reconciliation pass runs system-wide at a
//! time, guarded by a global lock; a pass that cannot take the lock is a
//! no-op. Per-app failures are contained: they are logged with the app
//! identity and the remaining apps still reconcile.

use anyhow::Result;
use metrics::counter;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::clients::catalog::CatalogApi;
use crate::clients::channel::ChannelNotifier;
use crate::lock::{LockService, SYNC_CATALOGS_LOCK_KEY};
use crate::models::app::{self, CODE_CHANNEL};
use crate::models::catalog;
use crate::repositories::{AppRepository, CatalogRepository};
use crate::settings::AppSettings;

/// Counters for one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub apps_processed: u64,
    pub apps_skipped: u64,
    pub apps_with_errors: u64,
    pub catalogs_created: u64,
    pub catalogs_deleted: u64,
}

/// Reconciler over every channel app's remote catalog listing.
pub struct CatalogReconciler {
    apps: AppRepository,
    catalogs: CatalogRepository,
    api: Arc<dyn CatalogApi>,
    notifier: Arc<dyn ChannelNotifier>,
    lock: LockService,
    lock_ttl_seconds: u64,
}

impl CatalogReconciler {
    pub fn new(
        apps: AppRepository,
        catalogs: CatalogRepository,
        api: Arc<dyn CatalogApi>,
        notifier: Arc<dyn ChannelNotifier>,
        lock: LockService,
        lock_ttl_seconds: u64,
    ) -> Self {
        Self {
            apps,
            catalogs,
            api,
            notifier,
            lock,
            lock_ttl_seconds,
        }
    }

    /// Runs reconciliation passes on an interval until shutdown.
    ///
    /// Each tick is jittered so a fleet of workers does not line up on the
    /// global lock at the same instant.
    pub async fn run_periodic(self: Arc<Self>, interval_seconds: u64, shutdown: CancellationToken) {
        info!(interval_seconds, "Starting catalog reconciliation loop");

        loop {
            let jitter = rand::thread_rng().gen_range(0..=interval_seconds / 10);
            let tick = Duration::from_secs(interval_seconds + jitter);

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Catalog reconciliation loop shutdown requested");
                    break;
                }
                _ = sleep(tick) => {
                    if let Err(err) = self.run().await {
                        error!(error = %err, "Catalog reconciliation pass failed");
                    }
                }
            }
        }
    }

    /// Runs one reconciliation pass over all channel apps.
    ///
    /// Returns immediately when another pass holds the global lock.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ReconcileStats> {
        if !self
            .lock
            .acquire(SYNC_CATALOGS_LOCK_KEY, self.lock_ttl_seconds, None)
            .await?
        {
            info!("Catalogs are already being synced by another worker");
            return Ok(ReconcileStats::default());
        }

        let result = self.run_locked().await;
        self.lock.release(SYNC_CATALOGS_LOCK_KEY).await?;
        result
    }

    async fn run_locked(&self) -> Result<ReconcileStats> {
        let mut stats = ReconcileStats::default();

        for channel_app in self.apps.list_by_code(CODE_CHANNEL).await? {
            match self.reconcile_app(&channel_app).await {
                Ok(Some((created, deleted))) => {
                    stats.apps_processed += 1;
                    stats.catalogs_created += created;
                    stats.catalogs_deleted += deleted;
                }
                Ok(None) => stats.apps_skipped += 1,
                Err(err) => {
                    stats.apps_with_errors += 1;
                    error!(
                        app_id = %channel_app.id,
                        error = %err,
                        "Error reconciling catalogs for app"
                    );
                }
            }
        }

        counter!("catalogs_created_total").increment(stats.catalogs_created);
        counter!("catalogs_deleted_total").increment(stats.catalogs_deleted);

        info!(
            processed = stats.apps_processed,
            skipped = stats.apps_skipped,
            errors = stats.apps_with_errors,
            created = stats.catalogs_created,
            deleted = stats.catalogs_deleted,
            "Catalog reconciliation pass completed"
        );

        Ok(stats)
    }

    /// Reconciles one channel app against the remote listing.
    ///
    /// Returns `None` when the app is missing its business or
    /// catalog-account identity (a no-op, not an error).
    pub async fn reconcile_app(&self, channel_app: &app::Model) -> Result<Option<(u64, u64)>> {
        let settings = AppSettings::from_config(&channel_app.config);

        let (Some(business_id), Some(_waba_id)) =
            (settings.wa_business_id.as_deref(), settings.wa_waba_id.as_deref())
        else {
            debug!(app_id = %channel_app.id, "App has no business/catalog-account identity, skipping");
            return Ok(None);
        };

        let remote_catalogs = self.api.list_catalogs(business_id).await?;
        if remote_catalogs.is_empty() {
            debug!(app_id = %channel_app.id, "Remote listing is empty, nothing to reconcile");
            return Ok(Some((0, 0)));
        }

        // The downstream consumer gets the full listing on every pass, even
        // when the diff below turns out empty.
        if let Some(notify_object_id) = channel_app.notify_object_id {
            if let Err(err) = self
                .notifier
                .update_catalogs(notify_object_id, &remote_catalogs)
                .await
            {
                warn!(
                    app_id = %channel_app.id,
                    error = %err,
                    "Error updating catalogs on downstream consumer"
                );
            }
        }

        let remote_ids: HashSet<String> = remote_catalogs
            .iter()
            .map(|remote| remote.id.clone())
            .collect();
        let local_ids: HashSet<String> = self
            .catalogs
            .list_remote_ids(channel_app.id)
            .await?
            .into_iter()
            .collect();

        let mut created = 0;
        for remote_id in remote_ids.difference(&local_ids) {
            let details = self.api.catalog_details(remote_id).await?;
            let record = catalog::ActiveModel {
                id: sea_orm::Set(Uuid::new_v4()),
                app_id: sea_orm::Set(channel_app.id),
                remote_id: sea_orm::Set(details.id.clone()),
                name: sea_orm::Set(details.name.clone()),
                category: sea_orm::Set(details.vertical.clone()),
                commerce_app_id: sea_orm::Set(None),
                created_at: sea_orm::Set(chrono::Utc::now().into()),
                updated_at: sea_orm::Set(chrono::Utc::now().into()),
            };

            match self.catalogs.create(record).await {
                Ok(_) => created += 1,
                Err(err) => {
                    warn!(
                        app_id = %channel_app.id,
                        remote_id = %remote_id,
                        error = %err,
                        "Error creating catalog for app"
                    );
                }
            }
        }

        let to_delete: Vec<String> = local_ids.difference(&remote_ids).cloned().collect();
        let deleted = match self
            .catalogs
            .delete_by_remote_ids(channel_app.id, &to_delete)
            .await
        {
            Ok(count) => count,
            Err(err) => {
                warn!(
                    app_id = %channel_app.id,
                    error = %err,
                    "Error deleting catalogs for app"
                );
                0
            }
        };

        Ok(Some((created, deleted)))
    }
}
