//! Connection pool setup for the worker's backing store (Postgres in
//! production, SQLite in tests).

use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Connection attempts before giving up on the database.
const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Why the pool could not be brought up.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("database URL is not configured")]
    MissingUrl,
    #[error("database unreachable after {attempts} attempts: {source}")]
    Unreachable {
        attempts: u32,
        source: sea_orm::DbErr,
    },
}

/// Opens the connection pool, retrying transient connect failures with
/// jittered exponential backoff.
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.is_empty() {
        return Err(PoolError::MissingUrl.into());
    }

    let mut options = ConnectOptions::new(&cfg.database_url);
    options
        .max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let mut backoff = Duration::from_millis(100);
    let mut attempt = 1;

    loop {
        match Database::connect(options.clone()).await {
            Ok(pool) => {
                info!(attempt, "Database pool ready");
                return Ok(pool);
            }
            Err(source) if attempt >= MAX_CONNECT_ATTEMPTS => {
                return Err(PoolError::Unreachable {
                    attempts: attempt,
                    source,
                }
                .into());
            }
            Err(err) => {
                warn!(
                    attempt,
                    error = %err,
                    delay_ms = backoff.as_millis() as u64,
                    "Database connect failed, retrying"
                );
                sleep(backoff).await;

                let jitter = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64 / 4);
                backoff = backoff * 2 + Duration::from_millis(jitter);
                attempt += 1;
            }
        }
    }
}

/// Verifies the pool can still reach the database.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    db.ping().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_database_url_is_rejected() {
        let config = AppConfig {
            database_url: String::new(),
            ..AppConfig::default()
        };

        let err = init_pool(&config).await.unwrap_err();
        assert!(matches!(
            err.downcast::<PoolError>(),
            Ok(PoolError::MissingUrl)
        ));
    }

    #[tokio::test]
    async fn in_memory_database_passes_health_check() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        health_check(&db).await.unwrap();
    }
}
