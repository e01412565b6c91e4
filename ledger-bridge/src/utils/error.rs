//! Engine error taxonomy.
//!
//! | Variant | Scope | Recovery |
//! |---------|-------|----------|
//! | `CatalogMiss` | one order | never retried (data-quality problem) |
//! | `Entry` | one order | retried in a later attempt |
//! | `Session` | one chunk | remaining orders fail for this attempt |
//! | `Config` | whole run | fatal before any submission |

use tracing::error;

/// Engine error enumeration.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A SKU has no resolvable catalog entry. Aborts that one order; the
    /// order is reported missing and not retried at the pricing stage.
    #[error("no catalog entry for SKU {sku}")]
    CatalogMiss { sku: String },

    /// The destination rejected a value, or an expected form element never
    /// became ready within the wait budget. Aborts the current order only.
    #[error("ledger entry failed for order {code}: {message}")]
    Entry { code: String, message: String },

    /// Authentication or navigation failure affecting the whole session.
    #[error("session failure: {0}")]
    Session(String),

    /// Missing or invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn catalog_miss(sku: impl Into<String>) -> Self {
        Self::CatalogMiss { sku: sku.into() }
    }

    pub fn entry(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Entry {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn session(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "session", error = %message, "session-level failure");
        Self::Session(message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the error condemns a single order rather than the session.
    pub fn is_order_scoped(&self) -> bool {
        matches!(self, SyncError::CatalogMiss { .. } | SyncError::Entry { .. })
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
