//! # Catalog Sync Worker Entry Point
//!
//! Long-running worker: periodic catalog reconciliation plus the job
//! executor consuming dispatched synchronization jobs.

use std::sync::Arc;

use clap::Parser;
use migration::{Migrator, MigratorTrait};
use tokio_util::sync::CancellationToken;

use catalog_sync::clients::catalog::{CatalogApi, GraphCatalogClient};
use catalog_sync::clients::channel::ChannelClient;
use catalog_sync::clients::commerce::DefaultCommerceFactory;
use catalog_sync::clients::incident::{HttpIncidentNotifier, IncidentNotifier};
use catalog_sync::config::ConfigLoader;
use catalog_sync::dispatch::QueueDispatcher;
use catalog_sync::executor::JobExecutor;
use catalog_sync::lock::LockService;
use catalog_sync::reconciler::CatalogReconciler;
use catalog_sync::repositories::{AppRepository, CatalogRepository};
use catalog_sync::{db, logging};

#[derive(Debug, Parser)]
#[command(name = "catalog-sync", about = "Catalog & product synchronization worker")]
struct Cli {
    /// Run a single reconciliation pass and exit
    #[arg(long)]
    reconcile_once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    println!("Loaded configuration for profile: {}", config.profile);
    if let Ok(redacted_json) = config.redacted_json() {
        println!("Configuration: {}", redacted_json);
    }

    logging::init_subscriber(&config);

    let db = Arc::new(db::init_pool(&config).await?);
    Migrator::up(db.as_ref(), None).await?;

    let catalog_api: Arc<dyn CatalogApi> = Arc::new(GraphCatalogClient::new(
        config.catalog_api_base.clone(),
        config.catalog_access_token.clone().unwrap_or_default(),
    ));
    let notifier = Arc::new(ChannelClient::new(config.channel_api_base.clone()));
    let incidents: Arc<dyn IncidentNotifier> = Arc::new(HttpIncidentNotifier::new(
        config
            .incident_api_base
            .clone()
            .unwrap_or_else(|| config.channel_api_base.clone()),
    ));
    let lock = LockService::new(db.clone());

    let reconciler = Arc::new(CatalogReconciler::new(
        AppRepository::new(db.clone()),
        CatalogRepository::new(db.clone()),
        catalog_api.clone(),
        notifier,
        lock.clone(),
        config.reconciler.lock_ttl_seconds,
    ));

    if cli.reconcile_once {
        reconciler.run().await?;
        return Ok(());
    }

    let dispatcher = Arc::new(QueueDispatcher::new(db.clone()));
    let commerce_factory = Arc::new(DefaultCommerceFactory {
        base_url_override: config.commerce_api_base.clone(),
    });
    let executor = Arc::new(JobExecutor::new(
        db.clone(),
        config.worker.clone(),
        config.upload.clone(),
        catalog_api,
        commerce_factory,
        incidents,
        dispatcher,
        lock,
    ));

    let shutdown = CancellationToken::new();

    let executor_handle = tokio::spawn(executor.run(shutdown.clone()));
    let reconciler_handle = tokio::spawn(
        reconciler.run_periodic(config.reconciler.interval_seconds, shutdown.clone()),
    );

    tokio::signal::ctrl_c().await?;
    shutdown.cancel();

    let _ = executor_handle.await;
    let _ = reconciler_handle.await;

    Ok(())
}
