//! # Product Staging
//!
//! Pages products out of the e-commerce provider and stages them as pending
//! upload rows, rendering each product into its feed row on the way in.
//! Staging an already-known product resets it to pending, which is the
//! engine's resync trigger.

use anyhow::Result;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::clients::commerce::CommerceApi;
use crate::repositories::upload_product::StagedProduct;
use crate::repositories::UploadProductRepository;
use crate::uploader::FeedEncoder;

/// Products fetched from the commerce provider per request.
const PAGE_SIZE: u32 = 100;

/// Stages commerce products into the upload queue of a catalog.
pub struct ProductStager {
    products: UploadProductRepository,
}

impl ProductStager {
    pub fn new(products: UploadProductRepository) -> Self {
        Self { products }
    }

    /// Pages every product (optionally scoped to sellers) into pending
    /// upload rows for the catalog. Returns how many rows were staged.
    #[instrument(skip(self, api, sellers), fields(catalog_id = %catalog_id))]
    pub async fn stage_catalog(
        &self,
        api: &dyn CommerceApi,
        catalog_id: Uuid,
        sellers: Option<&[String]>,
    ) -> Result<u64> {
        let mut staged = 0;
        let mut page = 1;

        loop {
            let listing = api.list_products(sellers, page, PAGE_SIZE).await?;

            let rows: Vec<StagedProduct> = listing
                .products
                .iter()
                .map(|product| StagedProduct {
                    remote_product_id: product.remote_product_id(),
                    data: FeedEncoder::render_row(product),
                })
                .collect();

            staged += self.products.stage(catalog_id, rows).await?;

            if !listing.has_more {
                break;
            }
            page += 1;
        }

        info!(staged, "Products staged for upload");
        Ok(staged)
    }
}
