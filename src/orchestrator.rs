//! # Sync Orchestrator
//!
//! Admission control for synchronization requests. Two entry modes share a
//! precondition chain checked in order, each failing fast with its own
//! error: first insertion (initial full catalog population) and by-seller
//! insertion (incremental, also used for webhook-driven updates). Every
//! state-changing side effect on the admission path is idempotent.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::dispatch::{JobPayload, TaskDispatcher};
use crate::models::app::{self, CODE_CHANNEL, CODE_COMMERCE};
use crate::models::catalog;
use crate::reconciler::CatalogReconciler;
use crate::repositories::{AppRepository, CatalogRepository, ProductFeedRepository};
use crate::settings::{ApiCredentials, AppSettings};

/// Why a synchronization request was not admitted.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("commerce app {0} does not exist")]
    CommerceAppNotFound(Uuid),
    #[error("the commerce app does not have a channel app id in its configuration")]
    MissingChannelApp,
    #[error("missing one or more API credentials")]
    MissingCredentials,
    #[error("the channel app {0} linked to the commerce app does not exist")]
    ChannelAppNotFound(Uuid),
    #[error("catalog {remote_id} not found for channel app {channel_app_id}")]
    CatalogNotFound {
        remote_id: String,
        channel_app_id: Uuid,
    },
    #[error("there must be a catalog linked to the commerce app {0}")]
    NoLinkedCatalog(Uuid),
    #[error("initial synchronization not completed")]
    InitialSyncIncomplete,
    #[error("connected catalog flag is not set")]
    CatalogNotConnected,
    #[error("at least one feed created is required")]
    MissingFeed,
    #[error("'sellers' is required")]
    SellersRequired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Orchestrator validating and dispatching synchronization requests.
pub struct SyncOrchestrator {
    apps: AppRepository,
    catalogs: CatalogRepository,
    feeds: ProductFeedRepository,
    reconciler: Arc<CatalogReconciler>,
    dispatcher: Arc<dyn TaskDispatcher>,
}

struct AdmissionContext {
    commerce_app: app::Model,
    settings: AppSettings,
    credentials: ApiCredentials,
    channel_app: app::Model,
}

impl SyncOrchestrator {
    pub fn new(
        apps: AppRepository,
        catalogs: CatalogRepository,
        feeds: ProductFeedRepository,
        reconciler: Arc<CatalogReconciler>,
        dispatcher: Arc<dyn TaskDispatcher>,
    ) -> Self {
        Self {
            apps,
            catalogs,
            feeds,
            reconciler,
            dispatcher,
        }
    }

    /// Admits a first product insertion for `remote_catalog_id`.
    ///
    /// On success the catalog's stale feeds are cleared, the connected flag
    /// and app link are set (writes only when not already in the target
    /// state), and the insert job is dispatched.
    #[instrument(skip(self, sellers), fields(commerce_app_id = %commerce_app_id, remote_catalog_id))]
    pub async fn start_first_insert(
        &self,
        commerce_app_id: Uuid,
        remote_catalog_id: &str,
        sellers: Option<Vec<String>>,
    ) -> Result<(), AdmissionError> {
        let ctx = self.validate_apps(commerce_app_id).await?;

        let catalog = self
            .find_or_sync_catalog(&ctx.channel_app, remote_catalog_id)
            .await?;

        let removed = self
            .feeds
            .delete_for_catalog(catalog.id)
            .await
            .map_err(AdmissionError::Internal)?;
        if removed > 0 {
            info!(catalog_id = %catalog.id, removed, "Deleted stale feeds linked to catalog");
        }

        self.connect_catalog_flag(&ctx).await?;

        let linked = self
            .catalogs
            .link_commerce_app(catalog.id, ctx.commerce_app.id)
            .await
            .map_err(AdmissionError::Internal)?;
        if linked {
            info!(
                catalog_id = %catalog.id,
                commerce_app_id = %ctx.commerce_app.id,
                "Catalog linked to commerce app"
            );
        }

        self.dispatcher
            .submit(JobPayload::InsertProducts {
                credentials: ctx.credentials,
                catalog_id: catalog.id,
                sellers,
            })
            .await
            .map_err(AdmissionError::Internal)?;

        info!(catalog = %catalog.name, "First insert admitted and dispatched");
        Ok(())
    }

    /// Admits an incremental insertion scoped to `sellers` (first-time
    /// seller onboarding and webhook-driven updates alike).
    #[instrument(skip(self, sellers), fields(commerce_app_id = %commerce_app_id))]
    pub async fn start_insert_by_seller(
        &self,
        commerce_app_id: Uuid,
        sellers: Vec<String>,
    ) -> Result<(), AdmissionError> {
        if sellers.is_empty() {
            return Err(AdmissionError::SellersRequired);
        }

        let ctx = self.validate_apps(commerce_app_id).await?;
        let catalog = self.validate_linked_catalog(&ctx).await?;

        if !ctx.settings.initial_sync_completed {
            return Err(AdmissionError::InitialSyncIncomplete);
        }

        // Legacy mode still uploads through a pre-registered feed; batch
        // mode creates its own upload sessions.
        if !ctx.settings.use_sync_v2 {
            self.feeds
                .find_first_for_catalog(catalog.id)
                .await
                .map_err(AdmissionError::Internal)?
                .ok_or(AdmissionError::MissingFeed)?;
        }

        if !ctx.settings.connected_catalog {
            return Err(AdmissionError::CatalogNotConnected);
        }

        self.dispatcher
            .submit(JobPayload::InsertProductsBySellers {
                credentials: ctx.credentials,
                catalog_id: catalog.id,
                sellers,
            })
            .await
            .map_err(AdmissionError::Internal)?;

        info!(catalog = %catalog.name, "By-seller insert admitted and dispatched");
        Ok(())
    }

    /// Shared preconditions: the commerce app, its channel app id, complete
    /// credentials, and the channel app itself. Checked in this order.
    async fn validate_apps(
        &self,
        commerce_app_id: Uuid,
    ) -> Result<AdmissionContext, AdmissionError> {
        let commerce_app = self
            .apps
            .find_by_id_and_code(commerce_app_id, CODE_COMMERCE)
            .await
            .map_err(AdmissionError::Internal)?
            .ok_or(AdmissionError::CommerceAppNotFound(commerce_app_id))?;

        let settings = AppSettings::from_config(&commerce_app.config);

        let channel_app_id = settings
            .channel_app_id
            .ok_or(AdmissionError::MissingChannelApp)?;

        let credentials = settings
            .complete_credentials()
            .cloned()
            .ok_or(AdmissionError::MissingCredentials)?;

        let channel_app = self
            .apps
            .find_by_id_and_code(channel_app_id, CODE_CHANNEL)
            .await
            .map_err(AdmissionError::Internal)?
            .ok_or(AdmissionError::ChannelAppNotFound(channel_app_id))?;

        if channel_app.notify_object_id.is_none() {
            warn!(app_id = %channel_app.id, "Channel app has no notify object id");
        }

        Ok(AdmissionContext {
            commerce_app,
            settings,
            credentials,
            channel_app,
        })
    }

    /// Looks the catalog up; when missing, runs one reconciliation pass for
    /// the channel app and retries before failing.
    async fn find_or_sync_catalog(
        &self,
        channel_app: &app::Model,
        remote_catalog_id: &str,
    ) -> Result<catalog::Model, AdmissionError> {
        if let Some(found) = self
            .catalogs
            .find_by_remote_id(channel_app.id, remote_catalog_id)
            .await
            .map_err(AdmissionError::Internal)?
        {
            return Ok(found);
        }

        info!(
            remote_catalog_id,
            channel_app_id = %channel_app.id,
            "Catalog not found locally, reconciling before retry"
        );
        self.reconciler
            .reconcile_app(channel_app)
            .await
            .map_err(AdmissionError::Internal)?;

        self.catalogs
            .find_by_remote_id(channel_app.id, remote_catalog_id)
            .await
            .map_err(AdmissionError::Internal)?
            .ok_or(AdmissionError::CatalogNotFound {
                remote_id: remote_catalog_id.to_string(),
                channel_app_id: channel_app.id,
            })
    }

    /// The by-seller entry requires an existing link: some catalog already
    /// linked to the commerce app, mirrored under the channel app.
    async fn validate_linked_catalog(
        &self,
        ctx: &AdmissionContext,
    ) -> Result<catalog::Model, AdmissionError> {
        let linked = self
            .catalogs
            .find_first_by_commerce_app(ctx.commerce_app.id)
            .await
            .map_err(AdmissionError::Internal)?
            .ok_or(AdmissionError::NoLinkedCatalog(ctx.commerce_app.id))?;

        self.catalogs
            .find_by_remote_id(ctx.channel_app.id, &linked.remote_id)
            .await
            .map_err(AdmissionError::Internal)?
            .ok_or(AdmissionError::CatalogNotFound {
                remote_id: linked.remote_id.clone(),
                channel_app_id: ctx.channel_app.id,
            })
    }

    /// Flips `connected_catalog` only when currently false.
    async fn connect_catalog_flag(&self, ctx: &AdmissionContext) -> Result<(), AdmissionError> {
        if ctx.settings.connected_catalog {
            return Ok(());
        }

        let mut settings = ctx.settings.clone();
        settings.connected_catalog = true;
        self.apps
            .save_settings(ctx.commerce_app.id, &settings)
            .await
            .map_err(AdmissionError::Internal)?;

        info!(app_id = %ctx.commerce_app.id, "Changed connected_catalog to true");
        Ok(())
    }
}
