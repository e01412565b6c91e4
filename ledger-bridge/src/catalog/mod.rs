//! Catalog Resolution
//!
//! Maps channel SKUs onto destination-catalog reference data before pricing
//! runs: canonical names and units, VAT-exclusive base prices, and bundle
//! expansion into physical component SKUs.

mod file;
mod resolver;

use async_trait::async_trait;
use shared::{BundleComponent, CatalogEntry};

use crate::utils::SyncResult;

pub use file::FileCatalog;
pub use resolver::CatalogResolver;

/// Read-only view of the destination catalog, keyed by SKU.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Returns the catalog entry for `sku`, or `None` when the SKU is
    /// unknown to the destination.
    async fn lookup(&self, sku: &str) -> SyncResult<Option<CatalogEntry>>;

    /// Constituents of a bundle SKU, or `None` when `sku` is unknown or
    /// not a bundle.
    async fn lookup_bundle(&self, sku: &str) -> SyncResult<Option<Vec<BundleComponent>>> {
        Ok(self
            .lookup(sku)
            .await?
            .filter(CatalogEntry::is_bundle)
            .map(|entry| entry.components))
    }
}
