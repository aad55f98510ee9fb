//! # Error Handling
//!
//! Shared error types for the catalog sync engine. Module-specific failures
//! (admission, upload, lock) live next to the code that raises them; this
//! module holds the provider failure kind every remote client maps into,
//! plus database error classification helpers.

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Failure reported by a remote provider.
///
/// Wraps a non-2xx HTTP response or an embedded error object, keeping the
/// raw payload so a failure can be reproduced from logs alone.
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Provider identifier (e.g., "catalog", "commerce")
    pub provider: String,
    /// HTTP status code from upstream, when the request got that far
    pub status: Option<u16>,
    /// Raw error payload returned by the provider
    pub payload: Option<JsonValue>,
    /// Human-readable summary
    pub message: String,
}

impl ProviderError {
    pub fn new<S: Into<String>>(provider: S, message: S) -> Self {
        Self {
            provider: provider.into(),
            status: None,
            payload: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "provider {} error", self.provider)?;
        if let Some(status) = self.status {
            write!(f, " (status {})", status)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Malformed product identifier: the SKU portion of `<sku>#<seller>` must be
/// numeric. Indicates a corrupt record rather than a transient condition.
#[derive(Debug, Clone, Error)]
#[error("invalid SKU ID: '{sku_part}' is not a number (product id '{product_id}')")]
pub struct InvalidSkuError {
    pub product_id: String,
    pub sku_part: String,
}

/// Returns true when the database error is a unique-constraint violation.
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    if let Some(code) = db_error.code() {
        let code_str = code.as_ref();
        if code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str) {
            return true;
        }
    }

    false
}
