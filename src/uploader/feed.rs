//! Feed uploader
//!
//! Submits an encoded batch to the remote provider and polls for
//! completion. Uploads are single-flight per feed on the provider side, so
//! a submission first waits out any upload already in progress; that wait
//! shares the same bounded poll budget as the post-submit completion wait.

use metrics::histogram;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::clients::catalog::CatalogApi;
use crate::error::ProviderError;

/// Why a feed upload failed.
#[derive(Debug, Error)]
pub enum UploadErrorKind {
    #[error("provider rejected the upload: {reason}")]
    Rejected { reason: String },
    #[error("upload did not complete within the expected time frame")]
    TimedOut,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A failed feed upload, with the upload session id when one was opened.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct UploadError {
    pub kind: UploadErrorKind,
    pub upload_id: Option<String>,
}

impl UploadError {
    fn new(kind: UploadErrorKind) -> Self {
        Self {
            kind,
            upload_id: None,
        }
    }

    fn with_upload_id(kind: UploadErrorKind, upload_id: impl Into<String>) -> Self {
        Self {
            kind,
            upload_id: Some(upload_id.into()),
        }
    }
}

/// Uploader for one remote feed endpoint.
#[derive(Clone)]
pub struct FeedUploader {
    api: Arc<dyn CatalogApi>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl FeedUploader {
    pub fn new(api: Arc<dyn CatalogApi>, poll_interval: Duration, max_poll_attempts: u32) -> Self {
        Self {
            api,
            poll_interval,
            max_poll_attempts,
        }
    }

    /// Uploads an encoded batch to `feed_id` and waits for completion.
    ///
    /// Returns the upload session id on success.
    pub async fn upload(
        &self,
        feed_id: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<String, UploadError> {
        let started = std::time::Instant::now();

        // Single-flight per feed: the provider refuses overlapping uploads,
        // so wait out any upload another worker already has in flight.
        if let Some(in_flight) = self
            .api
            .upload_in_progress(feed_id)
            .await
            .map_err(|e| UploadError::new(e.into()))?
        {
            info!(feed_id, upload_id = %in_flight, "Feed upload already in progress, waiting for completion");
            if !self.wait_for_completion(&in_flight).await? {
                return Err(UploadError::with_upload_id(
                    UploadErrorKind::TimedOut,
                    in_flight,
                ));
            }
        }

        let upload_id = self
            .api
            .create_upload(feed_id, file_name, contents)
            .await
            .map_err(|e| UploadError::new(e.into()))?
            .ok_or_else(|| {
                UploadError::new(UploadErrorKind::Rejected {
                    reason: "feed upload session was not created".to_string(),
                })
            })?;

        if !self.wait_for_completion(&upload_id).await? {
            return Err(UploadError::with_upload_id(
                UploadErrorKind::TimedOut,
                upload_id,
            ));
        }

        histogram!("feed_upload_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(feed_id, upload_id = %upload_id, "Feed upload completed");
        Ok(upload_id)
    }

    /// Polls the upload session until completion or the attempt budget runs
    /// out. Returns `false` on budget exhaustion.
    async fn wait_for_completion(&self, upload_id: &str) -> Result<bool, UploadError> {
        for attempt in 0..self.max_poll_attempts {
            let complete = self.api.upload_complete(upload_id).await.map_err(|e| {
                UploadError::with_upload_id(e.into(), upload_id)
            })?;

            if complete {
                return Ok(true);
            }

            if attempt + 1 < self.max_poll_attempts {
                sleep(self.poll_interval).await;
            }
        }

        warn!(
            upload_id,
            attempts = self.max_poll_attempts,
            "Feed upload did not complete within the poll budget"
        );
        Ok(false)
    }
}
