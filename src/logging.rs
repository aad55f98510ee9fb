//! Tracing subscriber setup for the worker.
//!
//! Structured JSON output by default; `CATSYNC_LOG_FORMAT=text` switches to
//! a human-readable format for local runs. Records emitted through the
//! `log` facade (sqlx, sea-orm) are bridged into tracing.

use crate::config::AppConfig;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

pub fn init_subscriber(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_log::LogTracer::init().ok();

    if config.log_format.eq_ignore_ascii_case("text") {
        let subscriber = Registry::default().with(filter).with(fmt::layer());
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set global default subscriber");
    } else {
        let subscriber = Registry::default().with(filter).with(fmt::layer().json());
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set global default subscriber");
    }
}
