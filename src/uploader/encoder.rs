//! Feed encoder
//!
//! Serializes a batch of product rows into the provider's comma-separated
//! feed format. No quoting scheme is used: embedded double quotes are
//! stripped and single quotes replaced with a space so a field can never
//! corrupt the delimiter-based format.

use crate::clients::commerce::RemoteProduct;
use crate::models::upload_product;

/// Fixed header describing the product attributes, emitted exactly once.
pub const FEED_HEADER: &str =
    "id,title,description,availability,status,condition,price,link,image_link,brand,sale_price";

/// Encoder for the provider's feed format.
pub struct FeedEncoder;

impl FeedEncoder {
    /// Encodes a batch of claimed rows into UTF-8 feed bytes.
    pub fn encode(rows: &[upload_product::Model]) -> Vec<u8> {
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(FEED_HEADER.to_string());

        for row in rows {
            lines.push(sanitize(&row.data));
        }

        lines.join("\n").into_bytes()
    }

    /// Renders one product into its feed row, stored at staging time.
    pub fn render_row(product: &RemoteProduct) -> String {
        [
            product.remote_product_id(),
            product.title.clone(),
            product.description.clone(),
            product.availability.clone(),
            product.status.clone(),
            product.condition.clone(),
            product.price.clone(),
            product.link.clone(),
            product.image_link.clone(),
            product.brand.clone(),
            product.sale_price.clone().unwrap_or_default(),
        ]
        .join(",")
    }
}

/// Strips double quotes and replaces single quotes with a space.
fn sanitize(text: &str) -> String {
    text.replace('"', "").replace('\'', " ")
}
