//! Order enrichment against the destination catalog.

use std::sync::Arc;

use shared::{CatalogEntry, Order, OrderLine, SubLine};
use tracing::warn;

use super::CatalogLookup;
use crate::utils::{SyncError, SyncResult};

/// Enriches ingested orders in place with catalog reference data.
///
/// Resolution is idempotent: a line that already carries its expanded
/// sub-lines is re-canonicalized but never expanded a second time.
pub struct CatalogResolver {
    catalog: Arc<dyn CatalogLookup>,
}

impl CatalogResolver {
    pub fn new(catalog: Arc<dyn CatalogLookup>) -> Self {
        Self { catalog }
    }

    /// Resolve every line of `order` against the catalog.
    ///
    /// Fails with [`SyncError::CatalogMiss`] on the first SKU the catalog
    /// does not know, condemning the whole order: a partially resolved
    /// order must never reach the ledger.
    pub async fn resolve_order(&self, order: &mut Order) -> SyncResult<()> {
        for line in &mut order.lines {
            if line.is_composite {
                self.resolve_sub_lines(&order.code, line).await?;
            } else {
                self.resolve_simple(line).await?;
            }
        }
        Ok(())
    }

    /// Canonicalize a simple line, expanding it when the catalog says the
    /// SKU is actually a bundle.
    async fn resolve_simple(&self, line: &mut OrderLine) -> SyncResult<()> {
        let entry = self.require(&line.sku).await?;

        if entry.is_bundle() {
            line.sub_lines = self.expand_bundle(&entry, line.quantity).await?;
            line.is_composite = true;
            line.product_name = entry.name;
            line.unit = Some(entry.unit);
            return Ok(());
        }

        line.product_name = entry.name;
        line.unit = Some(entry.unit);
        line.base_price = Some(entry.base_price);
        Ok(())
    }

    /// Expand one bundle entry into sub-lines. Component quantities are
    /// multiplied out by the ordered bundle quantity.
    async fn expand_bundle(
        &self,
        entry: &CatalogEntry,
        bundle_qty: i64,
    ) -> SyncResult<Vec<SubLine>> {
        let mut sub_lines = Vec::with_capacity(entry.components.len());
        for component in &entry.components {
            let resolved = self.require(&component.sku).await?;
            sub_lines.push(SubLine {
                sku: resolved.sku,
                product_name: resolved.name,
                unit: Some(resolved.unit),
                quantity: component.per_bundle_qty * bundle_qty,
                price: resolved.base_price,
                discount_rate: 0.0,
            });
        }
        Ok(sub_lines)
    }

    /// Canonicalize the sub-lines of a line the channel already shipped as
    /// composite. A component the catalog does not know keeps its channel
    /// price if it has one; with no price to fall back on the order fails.
    async fn resolve_sub_lines(&self, code: &str, line: &mut OrderLine) -> SyncResult<()> {
        for sub in &mut line.sub_lines {
            match self.catalog.lookup(&sub.sku).await? {
                Some(entry) => {
                    sub.product_name = entry.name;
                    sub.unit = Some(entry.unit);
                    sub.price = entry.base_price;
                }
                None if sub.price > 0.0 => {
                    warn!(
                        order = code,
                        sku = %sub.sku,
                        "component not in catalog, keeping channel price"
                    );
                }
                None => return Err(SyncError::catalog_miss(&sub.sku)),
            }
        }
        Ok(())
    }

    async fn require(&self, sku: &str) -> SyncResult<CatalogEntry> {
        self.catalog
            .lookup(sku)
            .await?
            .ok_or_else(|| SyncError::catalog_miss(sku))
    }
}
