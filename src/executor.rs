//! # Job Executor
//!
//! Background executor responsible for claiming queued dispatched jobs and
//! running them: product staging for insertion jobs, and the lock-guarded
//! batch upload loop for upload jobs. Claiming is atomic (conditional bulk
//! UPDATE from queued to running) so concurrent workers never run the same
//! job row twice.

use chrono::Utc;
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::clients::catalog::CatalogApi;
use crate::clients::commerce::{CommerceApi, CommerceApiFactory};
use crate::clients::incident::IncidentNotifier;
use crate::config::{UploadConfig, WorkerConfig};
use crate::dispatch::{
    JobPayload, STATUS_FAILED, STATUS_QUEUED, STATUS_RUNNING, STATUS_SUCCEEDED, TaskDispatcher,
};
use crate::lock::{LockService, seller_sync_lock_key, upload_lock_key};
use crate::models::catalog;
use crate::models::dispatched_job::{self, Entity as DispatchedJob};
use crate::repositories::{
    AppRepository, CatalogRepository, ProductFeedRepository, UploadLogRepository,
    UploadProductRepository,
};
use crate::settings::{ApiCredentials, AppSettings};
use crate::stager::ProductStager;
use crate::uploader::{FeedUploader, ProductUploader};

/// Executor running dispatched jobs against the engine components.
pub struct JobExecutor {
    db: Arc<DatabaseConnection>,
    config: WorkerConfig,
    upload: UploadConfig,
    apps: AppRepository,
    catalogs: CatalogRepository,
    feeds: ProductFeedRepository,
    products: UploadProductRepository,
    logs: UploadLogRepository,
    catalog_api: Arc<dyn CatalogApi>,
    commerce_factory: Arc<dyn CommerceApiFactory>,
    incidents: Arc<dyn IncidentNotifier>,
    dispatcher: Arc<dyn TaskDispatcher>,
    lock: LockService,
}

impl JobExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: WorkerConfig,
        upload: UploadConfig,
        catalog_api: Arc<dyn CatalogApi>,
        commerce_factory: Arc<dyn CommerceApiFactory>,
        incidents: Arc<dyn IncidentNotifier>,
        dispatcher: Arc<dyn TaskDispatcher>,
        lock: LockService,
    ) -> Self {
        Self {
            apps: AppRepository::new(db.clone()),
            catalogs: CatalogRepository::new(db.clone()),
            feeds: ProductFeedRepository::new(db.clone()),
            products: UploadProductRepository::new(db.clone()),
            logs: UploadLogRepository::new(db.clone()),
            db,
            config,
            upload,
            catalog_api,
            commerce_factory,
            incidents,
            dispatcher,
            lock,
        }
    }

    /// Get the executor configuration
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run the executor loop until the shutdown token fires.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> anyhow::Result<()> {
        info!("Starting job executor with config: {:?}", self.config);
        let tick = Duration::from_millis(self.config.tick_ms);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Job executor shutdown requested");
                    break;
                }
                _ = sleep(tick) => {
                    match self.clone().claim_and_run_jobs().await {
                        Ok(count) if count > 0 => debug!("Executed {} jobs", count),
                        Ok(_) => {}
                        Err(e) => error!("Error executing jobs: {}", e),
                    }
                }
            }
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Claim due jobs and execute them.
    #[instrument(skip(self), fields(batch_size = self.config.claim_batch))]
    pub async fn claim_and_run_jobs(self: Arc<Self>) -> anyhow::Result<usize> {
        let jobs = self.claim_jobs().await?;
        let count = jobs.len();

        if jobs.is_empty() {
            debug!("No due jobs found to claim");
            return Ok(0);
        }

        info!("Claimed {} jobs for execution", count);

        // Bounded concurrency across the claimed batch
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.concurrency));

        let mut handles = Vec::new();
        for job in jobs {
            let executor = self.clone();
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| anyhow::anyhow!("Failed to acquire semaphore permit"))?;

            let handle = tokio::spawn(async move {
                let _permit = permit; // Holds the permit until job completes
                if let Err(e) = executor.run_single_job(job).await {
                    error!("Error running job: {}", e);
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            let _ = handle.await;
        }

        Ok(count)
    }

    /// Claim due jobs from the queue with an atomic two-step transition.
    async fn claim_jobs(&self) -> anyhow::Result<Vec<dispatched_job::Model>> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let eligible = DispatchedJob::find()
            .select_only()
            .column(dispatched_job::Column::Id)
            .filter(dispatched_job::Column::Status.eq(STATUS_QUEUED))
            .filter(dispatched_job::Column::ScheduledAt.lte(now))
            .order_by_asc(dispatched_job::Column::ScheduledAt)
            .limit(Some(self.config.claim_batch))
            .into_tuple::<Uuid>()
            .all(&txn)
            .await?;

        if eligible.is_empty() {
            txn.commit().await?;
            return Ok(Vec::new());
        }

        DispatchedJob::update_many()
            .col_expr(dispatched_job::Column::Status, Expr::value(STATUS_RUNNING))
            .col_expr(dispatched_job::Column::StartedAt, Expr::value(now))
            .col_expr(
                dispatched_job::Column::Attempts,
                Expr::value(Expr::col(dispatched_job::Column::Attempts).add(1)),
            )
            .col_expr(dispatched_job::Column::UpdatedAt, Expr::value(now))
            .filter(dispatched_job::Column::Id.is_in(eligible.clone()))
            .filter(dispatched_job::Column::Status.eq(STATUS_QUEUED))
            .exec(&txn)
            .await?;

        // Only the rows we actually transitioned are ours to run
        let claimed = DispatchedJob::find()
            .filter(dispatched_job::Column::Id.is_in(eligible))
            .filter(dispatched_job::Column::Status.eq(STATUS_RUNNING))
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(claimed)
    }

    /// Run a single claimed job and record its outcome.
    #[instrument(skip(self, job), fields(job_id = %job.id, name = %job.name, queue = %job.queue))]
    pub async fn run_single_job(&self, job: dispatched_job::Model) -> anyhow::Result<()> {
        let start = std::time::Instant::now();
        info!("Starting job {} (attempt {})", job.id, job.attempts);

        let outcome = self.execute_job(&job).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(()) => {
                self.finish_job(&job, STATUS_SUCCEEDED, None).await?;
                counter!("jobs_succeeded_total").increment(1);
                info!("Completed job {} in {:?}", job.id, elapsed);
                Ok(())
            }
            Err(err) => {
                warn!("Job {} failed after {:?}: {}", job.id, elapsed, err);
                let details = serde_json::json!({
                    "message": err.to_string(),
                    "attempts": job.attempts,
                    "timestamp": Utc::now().to_rfc3339(),
                });
                self.finish_job(&job, STATUS_FAILED, Some(details)).await?;
                counter!("jobs_failed_total").increment(1);
                Err(err)
            }
        }
    }

    async fn execute_job(&self, job: &dispatched_job::Model) -> anyhow::Result<()> {
        let payload: JobPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| anyhow::anyhow!("malformed job payload: {e}"))?;

        match payload {
            JobPayload::InsertProducts {
                credentials,
                catalog_id,
                sellers,
            } => {
                self.handle_insert(credentials, catalog_id, sellers, true)
                    .await
            }
            JobPayload::InsertProductsBySellers {
                credentials,
                catalog_id,
                sellers,
            } => {
                self.handle_insert(credentials, catalog_id, Some(sellers), false)
                    .await
            }
            JobPayload::UploadProducts { app_id } => self.handle_upload(app_id).await,
        }
    }

    /// Stages products for the catalog and gates the follow-up upload job.
    ///
    /// A by-seller run additionally holds the app's seller-sync lock, so two
    /// workers never stage the same seller set concurrently.
    async fn handle_insert(
        &self,
        credentials: ApiCredentials,
        catalog_id: Uuid,
        sellers: Option<Vec<String>>,
        first_insert: bool,
    ) -> anyhow::Result<()> {
        let catalog = self
            .catalogs
            .find_by_id(catalog_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("catalog {catalog_id} not found"))?;

        let commerce_app_id = catalog
            .commerce_app_id
            .ok_or_else(|| anyhow::anyhow!("catalog {catalog_id} has no linked commerce app"))?;

        if first_insert {
            return self
                .stage_and_gate(credentials, &catalog, commerce_app_id, sellers, true)
                .await;
        }

        let seller_lock = seller_sync_lock_key(commerce_app_id);
        let payload = serde_json::json!({
            "app_id": commerce_app_id,
            "sellers": &sellers,
            "start_time": Utc::now().to_rfc3339(),
        });

        if !self
            .lock
            .acquire(&seller_lock, self.upload.lock_ttl_seconds, Some(payload))
            .await?
        {
            info!(app_id = %commerce_app_id, "Seller sync already running for app, skipping");
            return Ok(());
        }

        let result = self
            .stage_and_gate(credentials, &catalog, commerce_app_id, sellers, false)
            .await;
        self.lock.release(&seller_lock).await?;
        result
    }

    async fn stage_and_gate(
        &self,
        credentials: ApiCredentials,
        catalog: &catalog::Model,
        commerce_app_id: Uuid,
        sellers: Option<Vec<String>>,
        first_insert: bool,
    ) -> anyhow::Result<()> {
        let client = self.commerce_factory.client(&credentials);
        let sellers = self.resolve_sellers(client.as_ref(), sellers).await?;

        let stager = ProductStager::new(self.products.clone());
        let staged = stager
            .stage_catalog(client.as_ref(), catalog.id, sellers.as_deref())
            .await?;

        info!(
            catalog = %catalog.name,
            staged,
            first_insert,
            "Product staging completed"
        );

        if first_insert {
            self.mark_initial_sync_completed(commerce_app_id).await?;
        }

        self.check_and_start_upload(commerce_app_id).await?;
        Ok(())
    }

    /// A seller filter that is present but empty falls back to every active
    /// seller on the platform.
    async fn resolve_sellers(
        &self,
        client: &dyn CommerceApi,
        sellers: Option<Vec<String>>,
    ) -> anyhow::Result<Option<Vec<String>>> {
        match sellers {
            Some(list) if list.is_empty() => {
                info!("Seller filter empty, falling back to all active sellers");
                Ok(Some(client.list_active_sellers().await?))
            }
            other => Ok(other),
        }
    }

    /// Sets `initial_sync_completed` on the commerce app, writing only when
    /// the flag is currently false.
    async fn mark_initial_sync_completed(&self, commerce_app_id: Uuid) -> anyhow::Result<()> {
        let app = self
            .apps
            .find_by_id(commerce_app_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("commerce app {commerce_app_id} not found"))?;

        let mut settings = AppSettings::from_config(&app.config);
        if settings.initial_sync_completed {
            return Ok(());
        }

        settings.initial_sync_completed = true;
        self.apps.save_settings(commerce_app_id, &settings).await?;
        info!(app_id = %commerce_app_id, "Initial synchronization marked completed");
        Ok(())
    }

    /// Dispatches the upload job for an app unless its upload lock is held.
    pub async fn check_and_start_upload(&self, commerce_app_id: Uuid) -> anyhow::Result<()> {
        let key = upload_lock_key(commerce_app_id);

        if self.lock.is_held(&key).await? {
            info!(app_id = %commerce_app_id, "An upload task is already in progress for app");
            return Ok(());
        }

        info!(app_id = %commerce_app_id, "No active upload task for app, starting upload");
        self.dispatcher
            .submit(JobPayload::UploadProducts {
                app_id: commerce_app_id,
            })
            .await
    }

    /// Runs the batch upload loop for one app under its upload lock.
    async fn handle_upload(&self, commerce_app_id: Uuid) -> anyhow::Result<()> {
        let key = upload_lock_key(commerce_app_id);
        let payload = serde_json::json!({
            "app_id": commerce_app_id,
            "start_time": Utc::now().to_rfc3339(),
        });

        if !self
            .lock
            .acquire(&key, self.upload.lock_ttl_seconds, Some(payload))
            .await?
        {
            info!(app_id = %commerce_app_id, "Upload lock is held, skipping run");
            return Ok(());
        }

        let result = self.run_upload_locked(commerce_app_id, &key).await;
        self.lock.release(&key).await?;
        result
    }

    async fn run_upload_locked(&self, commerce_app_id: Uuid, lock_key: &str) -> anyhow::Result<()> {
        let catalog = self
            .catalogs
            .find_first_by_commerce_app(commerce_app_id)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("no catalog linked to commerce app {commerce_app_id}")
            })?;

        let feed = self
            .feeds
            .find_first_for_catalog(catalog.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no feed registered for catalog {}", catalog.id))?;

        let feed_uploader = FeedUploader::new(
            self.catalog_api.clone(),
            Duration::from_secs(self.upload.poll_interval_seconds),
            self.upload.max_poll_attempts,
        );

        let uploader = ProductUploader::new(
            catalog,
            commerce_app_id,
            feed.remote_feed_id,
            self.upload.batch_size,
            self.products.clone(),
            self.logs.clone(),
            feed_uploader,
            self.incidents.clone(),
            self.lock.clone(),
        );

        uploader
            .process_and_upload(lock_key, self.upload.lock_ttl_seconds)
            .await?;
        Ok(())
    }

    async fn finish_job(
        &self,
        job: &dispatched_job::Model,
        status: &str,
        error: Option<serde_json::Value>,
    ) -> anyhow::Result<()> {
        let now = Utc::now();

        DispatchedJob::update_many()
            .col_expr(dispatched_job::Column::Status, Expr::value(status))
            .col_expr(dispatched_job::Column::FinishedAt, Expr::value(now))
            .col_expr(dispatched_job::Column::UpdatedAt, Expr::value(now))
            .col_expr(dispatched_job::Column::Error, Expr::value(error))
            .filter(dispatched_job::Column::Id.eq(job.id))
            .exec(&*self.db)
            .await?;

        Ok(())
    }
}
