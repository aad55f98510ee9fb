//! Catalog provider client
//!
//! Graph-style client for the remote catalog provider: catalog listings for
//! a business identity, catalog details, and the feed upload session
//! endpoints used by the upload pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use crate::error::ProviderError;

const PROVIDER: &str = "catalog";

/// One catalog as reported by the remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCatalog {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<String>,
}

/// Remote catalog provider operations.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Lists every catalog owned by the given business identity.
    async fn list_catalogs(&self, business_id: &str) -> Result<Vec<RemoteCatalog>, ProviderError>;

    /// Fetches details for one catalog by its remote id.
    async fn catalog_details(&self, catalog_id: &str) -> Result<RemoteCatalog, ProviderError>;

    /// Returns the id of an upload currently in progress for the feed, if any.
    async fn upload_in_progress(&self, feed_id: &str) -> Result<Option<String>, ProviderError>;

    /// Submits an encoded batch to the feed, returning the upload session id.
    /// `None` means the provider accepted the request without starting an
    /// upload session.
    async fn create_upload(
        &self,
        feed_id: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Option<String>, ProviderError>;

    /// Returns true once the given upload session has completed.
    async fn upload_complete(&self, upload_id: &str) -> Result<bool, ProviderError>;
}

/// Graph API client configuration
#[derive(Debug, Clone)]
pub struct GraphApiConfig {
    pub base_url: String,
    pub access_token: String,
}

/// HTTP client for the catalog provider's Graph-style API
#[derive(Clone)]
pub struct GraphCatalogClient {
    config: GraphApiConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    data: Vec<RemoteCatalog>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadSession {
    id: String,
    #[serde(default)]
    end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadListing {
    #[serde(default)]
    data: Vec<UploadSession>,
}

impl GraphCatalogClient {
    /// Create a new client against the given API base
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            config: GraphApiConfig {
                base_url: base_url.into(),
                access_token: access_token.into(),
            },
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, url: &str) -> Result<JsonValue, ProviderError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| ProviderError::new(PROVIDER.to_string(), e.to_string()))?;

        read_json_body(response).await
    }
}

/// Reads a response body, mapping non-2xx statuses and embedded `error`
/// objects into provider errors that carry the raw payload.
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

    if body.get("error").is_some() {
        return Err(
            ProviderError::new(PROVIDER.to_string(), format!("error payload: {body}"))
                .with_status(status.as_u16())
                .with_payload(body),
        );
    }

    Ok(body)
}

#[async_trait]
impl CatalogApi for GraphCatalogClient {
    async fn list_catalogs(&self, business_id: &str) -> Result<Vec<RemoteCatalog>, ProviderError> {
        let mut url = format!(
            "{}?fields=id,name,vertical",
            self.url(&format!("{business_id}/owned_product_catalogs"))
        );
        let mut catalogs = Vec::new();

        // Follow pagination until the provider stops returning a next page
        loop {
            let body = self.get_json(&url).await?;
            let page: Listing = serde_json::from_value(body.clone()).map_err(|e| {
                ProviderError::new(PROVIDER.to_string(), format!("malformed listing: {e}"))
                    .with_payload(body)
            })?;

            catalogs.extend(page.data);

            match page.paging.and_then(|p| p.next) {
                Some(next) => {
                    // The provider hands back a fully-qualified next URL
                    Url::parse(&next).map_err(|e| {
                        ProviderError::new(
                            PROVIDER.to_string(),
                            format!("invalid paging url '{next}': {e}"),
                        )
                    })?;
                    url = next;
                }
                None => break,
            }
        }

        debug!(business_id, count = catalogs.len(), "Listed remote catalogs");
        Ok(catalogs)
    }

    async fn catalog_details(&self, catalog_id: &str) -> Result<RemoteCatalog, ProviderError> {
        let url = format!("{}?fields=id,name,vertical", self.url(catalog_id));
        let body = self.get_json(&url).await?;

        serde_json::from_value(body.clone()).map_err(|e| {
            ProviderError::new(PROVIDER.to_string(), format!("malformed catalog: {e}"))
                .with_payload(body)
        })
    }

    async fn upload_in_progress(&self, feed_id: &str) -> Result<Option<String>, ProviderError> {
        let url = self.url(&format!("{feed_id}/uploads"));
        let body = self.get_json(&url).await?;

        let listing: UploadListing = serde_json::from_value(body.clone()).map_err(|e| {
            ProviderError::new(PROVIDER.to_string(), format!("malformed uploads: {e}"))
                .with_payload(body)
        })?;

        Ok(listing
            .data
            .into_iter()
            .find(|session| session.end_time.is_none())
            .map(|session| session.id))
    }

    async fn create_upload(
        &self,
        feed_id: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Option<String>, ProviderError> {
        let url = self.url(&format!("{feed_id}/uploads"));
        let response = self
            .http
            .post(&url)
            .query(&[("file_name", file_name)])
            .bearer_auth(&self.config.access_token)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(contents)
            .send()
            .await
            .map_err(|e| ProviderError::new(PROVIDER.to_string(), e.to_string()))?;

        let body = read_json_body(response).await?;
        Ok(body
            .get("id")
            .and_then(|id| id.as_str())
            .map(|id| id.to_string()))
    }

    async fn upload_complete(&self, upload_id: &str) -> Result<bool, ProviderError> {
        let url = format!("{}?fields=id,end_time", self.url(upload_id));
        let body = self.get_json(&url).await?;

        let session: UploadSession = serde_json::from_value(body.clone()).map_err(|e| {
            ProviderError::new(PROVIDER.to_string(), format!("malformed upload: {e}"))
                .with_payload(body)
        })?;

        Ok(session.end_time.is_some())
    }
}
