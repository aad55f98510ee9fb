//! Configuration loading for the catalog sync service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `CATSYNC_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `CATSYNC_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default = "default_catalog_api_base")]
    pub catalog_api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commerce_api_base: Option<String>,
    #[serde(default = "default_channel_api_base")]
    pub channel_api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_api_base: Option<String>,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Job executor configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct WorkerConfig {
    /// Milliseconds between executor ticks
    #[serde(default = "default_worker_tick_ms")]
    pub tick_ms: u64,
    /// Maximum number of jobs to claim in one batch
    #[serde(default = "default_worker_claim_batch")]
    pub claim_batch: u64,
    /// Maximum number of concurrent jobs
    #[serde(default = "default_worker_concurrency")]
    pub concurrency: usize,
}

/// Catalog reconciliation configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ReconcilerConfig {
    /// Seconds between reconciliation passes
    #[serde(default = "default_reconciler_interval_seconds")]
    pub interval_seconds: u64,
    /// TTL for the global reconciliation lock
    #[serde(default = "default_reconciler_lock_ttl_seconds")]
    pub lock_ttl_seconds: u64,
}

/// Upload pipeline configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct UploadConfig {
    /// Maximum number of product rows fetched per batch
    #[serde(default = "default_upload_batch_size")]
    pub batch_size: u64,
    /// TTL for the per-app upload lock, renewed after every batch
    #[serde(default = "default_upload_lock_ttl_seconds")]
    pub lock_ttl_seconds: u64,
    /// Seconds between feed upload status polls
    #[serde(default = "default_upload_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    /// Maximum number of status polls before declaring a timeout
    #[serde(default = "default_upload_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

impl AppConfig {
    /// Serialize the configuration for startup logging.
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            if obj.contains_key("CATALOG_ACCESS_TOKEN") {
                obj.insert(
                    "CATALOG_ACCESS_TOKEN".to_string(),
                    serde_json::Value::String("***".to_string()),
                );
            }
        }
        serde_json::to_string(&value)
    }

    /// Validate configuration bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.batch_size == 0 {
            return Err(ConfigError::InvalidUploadBatchSize {
                value: self.upload.batch_size,
            });
        }
        if self.upload.max_poll_attempts == 0 {
            return Err(ConfigError::InvalidUploadPollAttempts {
                value: self.upload.max_poll_attempts,
            });
        }
        if self.upload.lock_ttl_seconds < 60 {
            return Err(ConfigError::InvalidUploadLockTtl {
                value: self.upload.lock_ttl_seconds,
            });
        }
        if self.reconciler.interval_seconds < 60 {
            return Err(ConfigError::InvalidReconcilerInterval {
                value: self.reconciler.interval_seconds,
            });
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            catalog_api_base: default_catalog_api_base(),
            catalog_access_token: None,
            commerce_api_base: None,
            channel_api_base: default_channel_api_base(),
            incident_api_base: None,
            worker: WorkerConfig::default(),
            reconciler: ReconcilerConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_worker_tick_ms(),
            claim_batch: default_worker_claim_batch(),
            concurrency: default_worker_concurrency(),
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_reconciler_interval_seconds(),
            lock_ttl_seconds: default_reconciler_lock_ttl_seconds(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_upload_batch_size(),
            lock_ttl_seconds: default_upload_lock_ttl_seconds(),
            poll_interval_seconds: default_upload_poll_interval_seconds(),
            max_poll_attempts: default_upload_max_poll_attempts(),
        }
    }
}

fn default_profile() -> String {
    "dev".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/catalog_sync".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_catalog_api_base() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_channel_api_base() -> String {
    "https://channel.internal".to_string()
}

fn default_worker_tick_ms() -> u64 {
    5_000
}

fn default_worker_claim_batch() -> u64 {
    10
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_reconciler_interval_seconds() -> u64 {
    1_800
}

fn default_reconciler_lock_ttl_seconds() -> u64 {
    600
}

fn default_upload_batch_size() -> u64 {
    30_000
}

fn default_upload_lock_ttl_seconds() -> u64 {
    86_400
}

fn default_upload_poll_interval_seconds() -> u64 {
    30
}

fn default_upload_max_poll_attempts() -> u32 {
    60
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("upload batch size must be positive, got {value}")]
    InvalidUploadBatchSize { value: u64 },
    #[error("upload max poll attempts must be positive, got {value}")]
    InvalidUploadPollAttempts { value: u32 },
    #[error("upload lock TTL must be at least 60 seconds, got {value}")]
    InvalidUploadLockTtl { value: u64 },
    #[error("reconciler interval must be at least 60 seconds, got {value}")]
    InvalidReconcilerInterval { value: u64 },
}

/// Loads configuration using layered `.env` files and `CATSYNC_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration from layered env files and the process environment.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("CATSYNC_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);

        let catalog_api_base = layered
            .remove("CATALOG_API_BASE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_catalog_api_base);
        let catalog_access_token = layered
            .remove("CATALOG_ACCESS_TOKEN")
            .filter(|v| !v.is_empty());
        let commerce_api_base = layered
            .remove("COMMERCE_API_BASE")
            .filter(|v| !v.is_empty());
        let channel_api_base = layered
            .remove("CHANNEL_API_BASE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_channel_api_base);
        let incident_api_base = layered
            .remove("INCIDENT_API_BASE")
            .filter(|v| !v.is_empty());

        let worker = WorkerConfig {
            tick_ms: layered
                .remove("WORKER_TICK_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_worker_tick_ms),
            claim_batch: layered
                .remove("WORKER_CLAIM_BATCH")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_worker_claim_batch),
            concurrency: layered
                .remove("WORKER_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_worker_concurrency),
        };

        let reconciler = ReconcilerConfig {
            interval_seconds: layered
                .remove("RECONCILER_INTERVAL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_reconciler_interval_seconds),
            lock_ttl_seconds: layered
                .remove("RECONCILER_LOCK_TTL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_reconciler_lock_ttl_seconds),
        };

        let upload = UploadConfig {
            batch_size: layered
                .remove("UPLOAD_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_upload_batch_size),
            lock_ttl_seconds: layered
                .remove("UPLOAD_LOCK_TTL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_upload_lock_ttl_seconds),
            poll_interval_seconds: layered
                .remove("UPLOAD_POLL_INTERVAL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_upload_poll_interval_seconds),
            max_poll_attempts: layered
                .remove("UPLOAD_MAX_POLL_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_upload_max_poll_attempts),
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            catalog_api_base,
            catalog_access_token,
            commerce_api_base,
            channel_api_base,
            incident_api_base,
            worker,
            reconciler,
            upload,
        };

        config.validate()?;

        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("CATSYNC_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("CATSYNC_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
