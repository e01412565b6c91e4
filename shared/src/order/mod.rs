//! Ingested order model.
//!
//! Orders arrive from a source channel as JSON and are enriched in place by
//! the catalog resolver and the pricing engine: fields are filled in, never
//! removed. A line is either *simple* (one SKU, one sale price) or
//! *composite* (a fixed-price combo carrying its constituent [`SubLine`]s).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Sales Channel
// ============================================================================

/// Source channel an order was ingested from.
///
/// Channel selection is a plain strategy value: the same submission session
/// implementation serves both channels, only header labels and ingestion
/// differ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesChannel {
    /// Retail e-commerce admin platform.
    #[default]
    Sapo,
    /// Custom storefront backend.
    Web,
}

impl std::fmt::Display for SalesChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SalesChannel::Sapo => write!(f, "SAPO"),
            SalesChannel::Web => write!(f, "Web"),
        }
    }
}

// ============================================================================
// Customer
// ============================================================================

/// Minimal customer summary carried on an order (header text only — the
/// ledger records retail sales against a generic customer label).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CustomerSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// ============================================================================
// Order Lines
// ============================================================================

/// Constituent of a composite line.
///
/// Quantity is already multiplied out: bundle quantity × per-bundle unit
/// count. `price` is the catalog VAT-exclusive unit base price once the
/// resolver has run; before that it may carry the source channel's own
/// per-sub-item price data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SubLine {
    pub sku: String,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub quantity: i64,
    /// VAT-exclusive unit base price.
    pub price: f64,
    /// Discount rate relative to the catalog base price (mirrors the parent
    /// line's rate, filled by the pricing engine).
    #[serde(default)]
    pub discount_rate: f64,
}

impl SubLine {
    /// Extended base value of this sub-line (`price × quantity`).
    pub fn base_value(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// One ordered line: simple or composite.
///
/// Invariant: exactly one of {simple with sku + sale price} or
/// {`is_composite` with a non-empty `sub_lines` sequence} holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OrderLine {
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub quantity: i64,
    /// VAT-inclusive unit sale price as charged by the channel.
    pub sale_price: f64,
    /// Catalog VAT-exclusive unit base price (filled by the resolver).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    /// Discount rate in percent relative to the catalog base price
    /// (filled by the pricing engine).
    #[serde(default)]
    pub discount_rate: f64,
    /// Company-funded discount amount allocated to this line.
    #[serde(default)]
    pub discount_amount: f64,
    /// Channel-funded (distributed) discount amount allocated to this line.
    #[serde(default)]
    pub distributed_discount_amount: f64,
    /// Computed VAT amount for the whole line (filled by the pricing engine).
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub is_composite: bool,
    #[serde(default)]
    pub sub_lines: Vec<SubLine>,
}

impl OrderLine {
    /// A plain one-SKU line.
    pub fn simple(sku: impl Into<String>, quantity: i64, sale_price: f64) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            sale_price,
            ..Default::default()
        }
    }

    /// A combo line already decomposed into sub-lines.
    pub fn composite(
        sku: impl Into<String>,
        quantity: i64,
        sale_price: f64,
        sub_lines: Vec<SubLine>,
    ) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            sale_price,
            is_composite: true,
            sub_lines,
            ..Default::default()
        }
    }

    /// VAT-inclusive sale value of the whole line.
    pub fn sale_value(&self) -> f64 {
        self.sale_price * self.quantity as f64
    }

    /// Checks the simple-xor-composite invariant.
    pub fn is_well_formed(&self) -> bool {
        if self.is_composite {
            !self.sub_lines.is_empty()
        } else {
            !self.sku.is_empty() && self.sub_lines.is_empty()
        }
    }
}

// ============================================================================
// Order
// ============================================================================

/// A sales order pulled from a source channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Order {
    /// Channel-unique order code.
    pub code: String,
    /// Creation timestamp (UTC).
    #[serde(default = "default_created_on")]
    pub created_on: DateTime<Utc>,
    pub channel: SalesChannel,
    /// Marketplace / storefront label, e.g. "Lazada" or "giangs.vn".
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
    /// Monetary total as recorded by the channel (VAT-inclusive).
    pub total: f64,
    /// Order-level discount amount applied by the channel.
    #[serde(default)]
    pub order_discount_amount: f64,
    pub lines: Vec<OrderLine>,
}

fn default_created_on() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Order {
    /// Sum of company-funded discount amounts across lines.
    pub fn company_discount_total(&self) -> f64 {
        self.lines.iter().map(|l| l.discount_amount).sum()
    }

    /// Sum of channel-distributed discount amounts across lines.
    pub fn distributed_discount_total(&self) -> f64 {
        self.lines.iter().map(|l| l.distributed_discount_amount).sum()
    }

    /// True when any line carries a channel-distributed discount.
    pub fn has_distributed_discount(&self) -> bool {
        self.distributed_discount_total() > 0.0
    }
}
