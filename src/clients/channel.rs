//! Downstream channel notifier
//!
//! Pushes the full current catalog listing for a connection to the
//! downstream messaging system, keyed by the channel app's object
//! identifier. Reconciliation notifies on every pass, diff or no diff.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use crate::clients::catalog::RemoteCatalog;
use crate::error::ProviderError;

const PROVIDER: &str = "channel";

/// Downstream notification consumer operations.
#[async_trait]
pub trait ChannelNotifier: Send + Sync {
    /// Replaces the consumer's view of the catalogs for one connection.
    async fn update_catalogs(
        &self,
        notify_object_id: Uuid,
        catalogs: &[RemoteCatalog],
    ) -> Result<(), ProviderError>;
}

/// HTTP client for the downstream channel system
#[derive(Clone)]
pub struct ChannelClient {
    base_url: String,
    http: reqwest::Client,
}

impl ChannelClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChannelNotifier for ChannelClient {
    async fn update_catalogs(
        &self,
        notify_object_id: Uuid,
        catalogs: &[RemoteCatalog],
    ) -> Result<(), ProviderError> {
        let url = format!(
            "{}/api/v1/catalogs/{notify_object_id}",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .json(catalogs)
            .send()
            .await
            .map_err(|e| ProviderError::new(PROVIDER.to_string(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);
            return Err(ProviderError::new(
                PROVIDER.to_string(),
                format!("catalog update rejected: {body}"),
            )
            .with_status(status.as_u16())
            .with_payload(body));
        }

        debug!(%notify_object_id, count = catalogs.len(), "Pushed catalogs downstream");
        Ok(())
    }
}
