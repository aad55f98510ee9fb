//! Product batch fetcher
//!
//! Produces successive bounded batches of pending product rows for one
//! catalog, claiming each selection into processing before returning it.
//! The sequence is lazy, finite, and non-restartable: once exhausted, rows
//! that later become pending again need a new fetcher pass.

use anyhow::Result;
use tracing::debug;
use uuid::Uuid;

use crate::models::upload_product;
use crate::repositories::UploadProductRepository;

/// One claimed batch: the rows plus their remote product identifiers.
pub type Batch = (Vec<upload_product::Model>, Vec<String>);

/// Fetcher over the pending rows of one catalog.
pub struct ProductBatchFetcher {
    repo: UploadProductRepository,
    catalog_id: Uuid,
    batch_size: u64,
    exhausted: bool,
}

impl ProductBatchFetcher {
    pub fn new(repo: UploadProductRepository, catalog_id: Uuid, batch_size: u64) -> Self {
        Self {
            repo,
            catalog_id,
            batch_size,
            exhausted: false,
        }
    }

    /// Claims the next batch, or returns `None` once the catalog has no
    /// pending rows left. A row claimed by one call is never re-emitted by a
    /// later call of the same fetcher.
    pub async fn next(&mut self) -> Result<Option<Batch>> {
        if self.exhausted {
            return Ok(None);
        }

        let rows = self
            .repo
            .claim_pending_batch(self.catalog_id, self.batch_size)
            .await?;

        if rows.is_empty() {
            debug!(catalog_id = %self.catalog_id, "No more pending products");
            self.exhausted = true;
            return Ok(None);
        }

        debug!(
            catalog_id = %self.catalog_id,
            count = rows.len(),
            "Products claimed into processing"
        );

        let remote_ids = rows.iter().map(|row| row.remote_product_id.clone()).collect();
        Ok(Some((rows, remote_ids)))
    }
}
