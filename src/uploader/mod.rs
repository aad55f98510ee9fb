//! # Product Upload Pipeline
//!
//! Batch loop composing the fetcher, encoder, and feed uploader: claim a
//! batch of pending rows, encode them, upload the feed, and record the
//! per-product outcome. The holder's lock is renewed after every batch so a
//! long multi-batch run is not pre-empted by TTL expiry.

pub mod batch;
pub mod encoder;
pub mod feed;

pub use batch::ProductBatchFetcher;
pub use encoder::{FEED_HEADER, FeedEncoder};
pub use feed::{FeedUploader, UploadError, UploadErrorKind};

use anyhow::Result;
use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::clients::incident::{Incident, IncidentNotifier};
use crate::error::InvalidSkuError;
use crate::lock::LockService;
use crate::models::catalog;
use crate::repositories::{UploadLogRepository, UploadProductRepository};

/// Extracts the numeric SKU from a `<sku>#<seller>` product identifier.
///
/// A non-numeric SKU portion is a hard error: it indicates a corrupt record,
/// not a transient condition.
pub fn extract_sku_id(product_id: &str) -> Result<i64, InvalidSkuError> {
    let sku_part = product_id.split('#').next().unwrap_or_default();
    sku_part.parse::<i64>().map_err(|_| InvalidSkuError {
        product_id: product_id.to_string(),
        sku_part: sku_part.to_string(),
    })
}

/// Outcome of one batch-loop invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadRunStats {
    pub batches: u32,
    pub uploaded: u64,
    pub failed: u64,
}

/// Batch upload pipeline for one catalog.
pub struct ProductUploader {
    catalog: catalog::Model,
    commerce_app_id: Uuid,
    feed_id: String,
    batch_size: u64,
    products: UploadProductRepository,
    logs: UploadLogRepository,
    feed: FeedUploader,
    incidents: Arc<dyn IncidentNotifier>,
    lock: LockService,
}

impl ProductUploader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: catalog::Model,
        commerce_app_id: Uuid,
        feed_id: String,
        batch_size: u64,
        products: UploadProductRepository,
        logs: UploadLogRepository,
        feed: FeedUploader,
        incidents: Arc<dyn IncidentNotifier>,
        lock: LockService,
    ) -> Self {
        Self {
            catalog,
            commerce_app_id,
            feed_id,
            batch_size,
            products,
            logs,
            feed,
            incidents,
            lock,
        }
    }

    /// Processes pending products in batches and uploads them, renewing the
    /// lock after every batch.
    ///
    /// An unexpected error escaping a batch body marks that batch's claimed
    /// ids as error and stops the loop; earlier committed batches are left
    /// untouched. A failure before any batch was claimed is a safe no-op.
    #[instrument(skip(self), fields(catalog_id = %self.catalog.id, feed_id = %self.feed_id))]
    pub async fn process_and_upload(
        &self,
        lock_key: &str,
        lock_ttl_seconds: u64,
    ) -> Result<UploadRunStats> {
        let mut fetcher = ProductBatchFetcher::new(
            self.products.clone(),
            self.catalog.id,
            self.batch_size,
        );
        let mut stats = UploadRunStats::default();
        let mut current_ids: Vec<String> = Vec::new();

        let outcome = self
            .run_batches(&mut fetcher, lock_key, lock_ttl_seconds, &mut stats, &mut current_ids)
            .await;

        if let Err(err) = outcome {
            error!(
                catalog_id = %self.catalog.id,
                commerce_app_id = %self.commerce_app_id,
                error = %err,
                "Batch loop aborted"
            );
            // Ids claimed by the failed batch must not stay in processing.
            // Empty when the failure hit before a batch was claimed.
            self.products
                .mark_error(self.catalog.id, &current_ids)
                .await?;
        }

        info!(
            catalog_id = %self.catalog.id,
            batches = stats.batches,
            uploaded = stats.uploaded,
            failed = stats.failed,
            "Upload run finished"
        );
        Ok(stats)
    }

    async fn run_batches(
        &self,
        fetcher: &mut ProductBatchFetcher,
        lock_key: &str,
        lock_ttl_seconds: u64,
        stats: &mut UploadRunStats,
        current_ids: &mut Vec<String>,
    ) -> Result<()> {
        while let Some((rows, remote_ids)) = fetcher.next().await? {
            *current_ids = remote_ids.clone();
            stats.batches += 1;

            let contents = FeedEncoder::encode(&rows);
            let file_name = format!(
                "update_{}_{}",
                Utc::now().format("%Y-%m-%d_%H-%M"),
                self.catalog.remote_id
            );

            match self
                .feed
                .upload(&self.feed_id, &file_name, contents.clone())
                .await
            {
                Ok(_) => {
                    let marked = self
                        .products
                        .mark_success(self.catalog.id, &remote_ids)
                        .await?;
                    self.log_sent_products(&remote_ids).await?;
                    stats.uploaded += marked;
                    counter!("products_uploaded_total").increment(marked);
                }
                Err(upload_err) => {
                    let marked = self
                        .products
                        .mark_error(self.catalog.id, &remote_ids)
                        .await?;
                    stats.failed += marked;
                    counter!("products_upload_failed_total").increment(marked);

                    self.audit_failure(&contents, &file_name, &upload_err);
                    self.notify_incident(&upload_err).await;
                }
            }

            // A multi-batch run can outlive the lock TTL; push the expiry
            // out after every batch, success or failure.
            if !self.lock.renew(lock_key, lock_ttl_seconds).await? {
                warn!(lock_key, "Lock holdership lost during upload run");
            }

            current_ids.clear();
        }

        Ok(())
    }

    /// Appends one audit row per successfully sent product.
    async fn log_sent_products(&self, remote_ids: &[String]) -> Result<()> {
        for remote_id in remote_ids {
            let sku_id = extract_sku_id(remote_id)?;
            self.logs.append(sku_id, self.commerce_app_id).await?;
        }

        info!(count = remote_ids.len(), "Logged products as sent");
        Ok(())
    }

    /// Emits the durable failure artifact: the encoded batch plus enough
    /// context to reproduce the failure from logs alone.
    fn audit_failure(&self, contents: &[u8], file_name: &str, upload_err: &UploadError) {
        error!(
            catalog = %self.catalog.name,
            catalog_id = %self.catalog.id,
            commerce_app_id = %self.commerce_app_id,
            feed_id = %self.feed_id,
            file_name,
            upload_id = upload_err.upload_id.as_deref().unwrap_or(""),
            error = %upload_err,
            batch_bytes = contents.len(),
            batch_content = %String::from_utf8_lossy(contents),
            "Feed upload failed"
        );
    }

    /// Best-effort incident notification; delivery failure is only logged.
    async fn notify_incident(&self, upload_err: &UploadError) {
        let incident = Incident {
            name: format!("Error sending products to catalog {}", self.catalog.name),
            catalog_name: self.catalog.name.clone(),
            app_id: self.commerce_app_id,
            details: upload_err.to_string(),
        };

        if let Err(err) = self.incidents.create_incident(incident).await {
            warn!(error = %err, "Incident notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::extract_sku_id;

    #[test]
    fn extracts_numeric_sku() {
        assert_eq!(extract_sku_id("55#7").unwrap(), 55);
        assert_eq!(extract_sku_id("123456#seller-9").unwrap(), 123456);
    }

    #[test]
    fn rejects_non_numeric_sku() {
        let err = extract_sku_id("abc#7").unwrap_err();
        assert_eq!(err.sku_part, "abc");
    }

    #[test]
    fn rejects_empty_sku() {
        assert!(extract_sku_id("#7").is_err());
        assert!(extract_sku_id("").is_err());
    }
}
