//! Destination-catalog reference data.
//!
//! Read-only to the engine: the catalog is owned by an external
//! `CatalogLookup` collaborator and keyed by SKU.

use serde::{Deserialize, Serialize};

/// Constituent of a bundle SKU: which physical SKU ships, and how many units
/// per one bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleComponent {
    pub sku: String,
    pub per_bundle_qty: i64,
}

/// Catalog reference data for one SKU.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogEntry {
    pub sku: String,
    /// Canonical product name as the ledger knows it.
    pub name: String,
    /// Canonical unit of measure.
    pub unit: String,
    /// VAT-exclusive base price per unit.
    pub base_price: f64,
    /// Non-empty for bundle SKUs: the physical SKUs one bundle expands into.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<BundleComponent>,
}

impl CatalogEntry {
    pub fn is_bundle(&self) -> bool {
        !self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_detection() {
        let plain = CatalogEntry {
            sku: "S1".into(),
            base_price: 1000.0,
            ..Default::default()
        };
        assert!(!plain.is_bundle());

        let bundle = CatalogEntry {
            sku: "B1".into(),
            components: vec![
                BundleComponent { sku: "S1".into(), per_bundle_qty: 2 },
                BundleComponent { sku: "S2".into(), per_bundle_qty: 1 },
            ],
            ..Default::default()
        };
        assert!(bundle.is_bundle());
    }
}
