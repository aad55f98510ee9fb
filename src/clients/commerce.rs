//! E-commerce provider client
//!
//! Read-only client for the e-commerce platform: credential validation,
//! active seller listing, and paginated product listing with an optional
//! seller filter. Products come back with the attributes the feed row
//! carries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::ProviderError;
use crate::settings::ApiCredentials;

const PROVIDER: &str = "commerce";

/// One product as reported by the e-commerce platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProduct {
    pub sku_id: u64,
    pub seller_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub availability: String,
    pub status: String,
    pub condition: String,
    pub price: String,
    pub link: String,
    pub image_link: String,
    pub brand: String,
    #[serde(default)]
    pub sale_price: Option<String>,
}

impl RemoteProduct {
    /// Compound remote identifier embedding SKU and seller.
    pub fn remote_product_id(&self) -> String {
        format!("{}#{}", self.sku_id, self.seller_id)
    }
}

/// One page of products.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<RemoteProduct>,
    #[serde(default)]
    pub has_more: bool,
}

/// E-commerce provider operations.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Checks that the configured credentials are accepted by the platform.
    async fn validate_credentials(&self) -> Result<bool, ProviderError>;

    /// Lists the identifiers of currently active sellers.
    async fn list_active_sellers(&self) -> Result<Vec<String>, ProviderError>;

    /// Lists one page of products, optionally scoped to a set of sellers.
    async fn list_products(
        &self,
        sellers: Option<&[String]>,
        page: u32,
        page_size: u32,
    ) -> Result<ProductPage, ProviderError>;
}

/// Builds a commerce client for a tenant's credentials.
///
/// Jobs carry credentials in their payload; the executor turns them into a
/// client through this seam so tests can substitute a mock.
pub trait CommerceApiFactory: Send + Sync {
    fn client(&self, credentials: &ApiCredentials) -> std::sync::Arc<dyn CommerceApi>;
}

/// Default factory deriving the API base from the credential domain, with
/// an optional fixed override (useful for tests and proxies).
#[derive(Debug, Clone, Default)]
pub struct DefaultCommerceFactory {
    pub base_url_override: Option<String>,
}

impl CommerceApiFactory for DefaultCommerceFactory {
    fn client(&self, credentials: &ApiCredentials) -> std::sync::Arc<dyn CommerceApi> {
        match &self.base_url_override {
            Some(base) => std::sync::Arc::new(CommerceClient::with_base_url(
                credentials.clone(),
                base.clone(),
            )),
            None => std::sync::Arc::new(CommerceClient::new(credentials.clone())),
        }
    }
}

/// HTTP client for the e-commerce platform's private API
#[derive(Clone)]
pub struct CommerceClient {
    base_url: String,
    credentials: ApiCredentials,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SellerListing {
    #[serde(default)]
    items: Vec<Seller>,
}

#[derive(Debug, Deserialize)]
struct Seller {
    id: String,
    #[serde(default)]
    is_active: bool,
}

impl CommerceClient {
    /// Create a client from credentials; the API base is derived from the
    /// credential domain.
    pub fn new(credentials: ApiCredentials) -> Self {
        let base_url = format!("https://{}", credentials.domain);
        Self::with_base_url(credentials, base_url)
    }

    /// Create a client against an explicit API base (useful for tests)
    pub fn with_base_url(credentials: ApiCredentials, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            http: reqwest::Client::new(),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        self.http
            .get(url)
            .header("X-App-Key", &self.credentials.app_key)
            .header("X-App-Token", &self.credentials.app_token)
    }
}

async fn read_json_body(response: reqwest::Response) -> Result<JsonValue, ProviderError> {
    let status = response.status();
    let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);

    if !status.is_success() {
        return Err(
            ProviderError::new(PROVIDER.to_string(), format!("request failed: {body}"))
                .with_status(status.as_u16())
                .with_payload(body),
        );
    }

    Ok(body)
}

#[async_trait]
impl CommerceApi for CommerceClient {
    async fn validate_credentials(&self) -> Result<bool, ProviderError> {
        let response = self
            .request("/api/private/credentials/validate")
            .send()
            .await
            .map_err(|e| ProviderError::new(PROVIDER.to_string(), e.to_string()))?;

        match response.status().as_u16() {
            200 => Ok(true),
            401 | 403 => Ok(false),
            status => {
                let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);
                Err(ProviderError::new(
                    PROVIDER.to_string(),
                    format!("credential validation failed: {body}"),
                )
                .with_status(status)
                .with_payload(body))
            }
        }
    }

    async fn list_active_sellers(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .request("/api/private/sellers")
            .send()
            .await
            .map_err(|e| ProviderError::new(PROVIDER.to_string(), e.to_string()))?;

        let body = read_json_body(response).await?;
        let listing: SellerListing = serde_json::from_value(body.clone()).map_err(|e| {
            ProviderError::new(PROVIDER.to_string(), format!("malformed sellers: {e}"))
                .with_payload(body)
        })?;

        let sellers: Vec<String> = listing
            .items
            .into_iter()
            .filter(|seller| seller.is_active)
            .map(|seller| seller.id)
            .collect();

        debug!(count = sellers.len(), "Listed active sellers");
        Ok(sellers)
    }

    async fn list_products(
        &self,
        sellers: Option<&[String]>,
        page: u32,
        page_size: u32,
    ) -> Result<ProductPage, ProviderError> {
        let mut request = self.request("/api/private/products").query(&[
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ]);

        if let Some(sellers) = sellers.filter(|s| !s.is_empty()) {
            request = request.query(&[("sellers", sellers.join(","))]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::new(PROVIDER.to_string(), e.to_string()))?;

        let body = read_json_body(response).await?;
        serde_json::from_value(body.clone()).map_err(|e| {
            ProviderError::new(PROVIDER.to_string(), format!("malformed products: {e}"))
                .with_payload(body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_product_id_embeds_sku_and_seller() {
        let product = RemoteProduct {
            sku_id: 55,
            seller_id: "7".to_string(),
            title: "Shirt".to_string(),
            description: String::new(),
            availability: "in stock".to_string(),
            status: "active".to_string(),
            condition: "new".to_string(),
            price: "19.90 BRL".to_string(),
            link: "https://store.example/shirt".to_string(),
            image_link: "https://store.example/shirt.jpg".to_string(),
            brand: "Acme".to_string(),
            sale_price: None,
        };

        assert_eq!(product.remote_product_id(), "55#7");
    }
}
