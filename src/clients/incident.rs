//! Incident notifier
//!
//! Best-effort external incident notifications raised when a feed upload
//! fails. Delivery failures are logged by the caller and never escalated.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::ProviderError;

const PROVIDER: &str = "incident";

/// One incident to report.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub name: String,
    pub catalog_name: String,
    pub app_id: Uuid,
    pub details: String,
}

/// External incident notification operations.
#[async_trait]
pub trait IncidentNotifier: Send + Sync {
    async fn create_incident(&self, incident: Incident) -> Result<(), ProviderError>;
}

/// HTTP incident notifier
#[derive(Clone)]
pub struct HttpIncidentNotifier {
    base_url: String,
    http: reqwest::Client,
}

impl HttpIncidentNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IncidentNotifier for HttpIncidentNotifier {
    async fn create_incident(&self, incident: Incident) -> Result<(), ProviderError> {
        let url = format!("{}/api/v1/incidents", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .json(&incident)
            .send()
            .await
            .map_err(|e| ProviderError::new(PROVIDER.to_string(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);
            return Err(ProviderError::new(
                PROVIDER.to_string(),
                format!("incident creation rejected: {body}"),
            )
            .with_status(status.as_u16())
            .with_payload(body));
        }

        Ok(())
    }
}
