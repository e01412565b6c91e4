//! Run configuration — all knobs an operator supplies for one batch run.
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | CHUNK_COUNT | 4 | parallel submission sessions per attempt |
//! | MAX_ATTEMPTS | 10 | attempt budget for the retry loop |
//! | ELEMENT_WAIT_MS | 30000 | per-element wait budget inside a form client |
//! | ENVIRONMENT | "" | label prefix stamped on header fields (test/staging) |
//! | DISCOUNT_ITEM_SKU | CK | SKU of the synthetic order-discount row |
//! | WAREHOUSE_ID | KHO1 | warehouse code for export documents |
//! | BALANCE_SANITY_THRESHOLD | 1000 | max rounding drift auto-absorbed |
//! | LOG_DIR | (unset) | rolling file log directory |

use crate::utils::error::{SyncError, SyncResult};

#[derive(Debug, Clone)]
pub struct Config {
    /// Number of parallel submission sessions; also the partition count.
    pub chunk_count: usize,
    /// Attempt budget for the reconciliation retry loop.
    pub max_attempts: u32,
    /// Per-element wait budget for form clients (milliseconds).
    pub element_wait_ms: u64,
    /// Prefix stamped on header labels so non-production runs are visible
    /// inside the ledger.
    pub environment: String,
    /// SKU of the synthetic row that records whole-order promotions.
    pub discount_item_sku: String,
    /// Warehouse code filled on export-document rows.
    pub warehouse_id: String,
    /// Largest document-total drift the balancing fixup will absorb;
    /// anything above is refused and surfaced as an entry failure.
    pub balance_sanity_threshold: f64,
    /// Optional directory for rolling file logs.
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, using defaults for
    /// anything unset. Invalid values are a fatal [`SyncError::Config`].
    pub fn from_env() -> SyncResult<Self> {
        let config = Self {
            chunk_count: parse_env("CHUNK_COUNT", 4)?,
            max_attempts: parse_env("MAX_ATTEMPTS", 10)?,
            element_wait_ms: parse_env("ELEMENT_WAIT_MS", 30_000)?,
            environment: std::env::var("ENVIRONMENT").unwrap_or_default(),
            discount_item_sku: std::env::var("DISCOUNT_ITEM_SKU")
                .unwrap_or_else(|_| "CK".into()),
            warehouse_id: std::env::var("WAREHOUSE_ID").unwrap_or_else(|_| "KHO1".into()),
            balance_sanity_threshold: parse_env("BALANCE_SANITY_THRESHOLD", 1000.0)?,
            log_dir: std::env::var("LOG_DIR").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the concurrency knobs. Common in tests.
    pub fn with_overrides(chunk_count: usize, max_attempts: u32) -> Self {
        Self {
            chunk_count,
            max_attempts,
            element_wait_ms: 30_000,
            environment: String::new(),
            discount_item_sku: "CK".into(),
            warehouse_id: "KHO1".into(),
            balance_sanity_threshold: 1000.0,
            log_dir: None,
        }
    }

    fn validate(&self) -> SyncResult<()> {
        if self.chunk_count == 0 {
            return Err(SyncError::config("CHUNK_COUNT must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(SyncError::config("MAX_ATTEMPTS must be at least 1"));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> SyncResult<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| SyncError::config(format!("{name} has invalid value {raw:?}"))),
        Err(_) => Ok(default),
    }
}
