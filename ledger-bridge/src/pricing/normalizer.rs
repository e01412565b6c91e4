//! Order normalization.
//!
//! Flattens a resolved, priced order into the exact row set the entry form
//! is filled from: one billable row per simple line or combo component, plus
//! synthetic negative rows for whole-order discounts, plus the appendix
//! notes the ledger document carries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use shared::{Order, SalesChannel};

use super::calculator::{is_promotional, price_line};
use crate::utils::SyncResult;

// ============================================================================
// Billable entries
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryKind {
    /// A physical SKU row (simple line or combo component).
    Item,
    /// A synthetic negative row recording a whole-order discount.
    OrderDiscount,
}

/// One row of the ledger document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillableEntry {
    pub kind: EntryKind,
    pub sku: String,
    pub product_name: String,
    pub unit: Option<String>,
    pub quantity: i64,
    /// VAT-exclusive unit price. Zero for discount rows.
    pub unit_price: f64,
    pub discount_rate: f64,
    /// Extended value of the row. Negative for discount rows.
    pub amount: f64,
    pub tax_amount: f64,
    /// Raises the destination's promotion flag on this row.
    pub promotional: bool,
}

/// An order flattened into form-ready rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedOrder {
    pub code: String,
    pub created_on: DateTime<Utc>,
    pub channel: SalesChannel,
    pub source_name: String,
    /// Channel total, VAT-inclusive. The saved document must match it.
    pub total: f64,
    pub has_distributed_discount: bool,
    pub entries: Vec<BillableEntry>,
    /// Appendix notes, one per document.
    pub notes: Vec<String>,
}

impl NormalizedOrder {
    /// Customer label the header carries: retail customer tagged with the
    /// channel and the marketplace the sale came through.
    pub fn customer_label(&self) -> String {
        format!(
            "Khách lẻ {} - Bán hàng qua {}",
            self.channel, self.source_name
        )
    }

    /// Physical quantities per SKU for the warehouse export document,
    /// summed across rows and sorted by SKU.
    pub fn warehouse_quantities(&self) -> BTreeMap<String, i64> {
        let mut quantities = BTreeMap::new();
        for entry in &self.entries {
            if entry.kind == EntryKind::Item {
                *quantities.entry(entry.sku.clone()).or_insert(0) += entry.quantity;
            }
        }
        quantities
    }

    /// Rows carrying the promotion flag.
    pub fn promotional_rows(&self) -> impl Iterator<Item = (usize, &BillableEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.promotional)
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Price every line of a resolved order and flatten it into a
/// [`NormalizedOrder`]. `discount_item_sku` names the synthetic SKU the
/// ledger books whole-order discounts under.
pub fn normalize_order(order: &mut Order, discount_item_sku: &str) -> SyncResult<NormalizedOrder> {
    let code = order.code.clone();
    let mut entries = Vec::new();

    for line in &mut order.lines {
        price_line(&code, line)?;

        if line.is_composite {
            for sub in &line.sub_lines {
                entries.push(BillableEntry {
                    kind: EntryKind::Item,
                    sku: sub.sku.clone(),
                    product_name: sub.product_name.clone(),
                    unit: sub.unit.clone(),
                    quantity: sub.quantity,
                    unit_price: sub.price,
                    discount_rate: sub.discount_rate,
                    amount: sub.base_value(),
                    tax_amount: 0.0,
                    promotional: is_promotional(sub.discount_rate, sub.price),
                });
            }
            // Per-sub taxes were already summed on the parent; spread them
            // back onto the emitted rows pro rata of base value so each row
            // carries its own tax.
            spread_tax(&mut entries, line.tax_amount, line.sub_lines.len());
        } else {
            let unit_price = line.base_price.unwrap_or_default();
            entries.push(BillableEntry {
                kind: EntryKind::Item,
                sku: line.sku.clone(),
                product_name: line.product_name.clone(),
                unit: line.unit.clone(),
                quantity: line.quantity,
                unit_price,
                discount_rate: line.discount_rate,
                amount: unit_price * line.quantity as f64,
                tax_amount: line.tax_amount,
                promotional: is_promotional(line.discount_rate, unit_price),
            });
        }
    }

    let mut notes = vec![format!(
        "Order {} ({}/{}) created {}",
        order.code,
        order.channel,
        order.source_name,
        order.created_on.format("%Y-%m-%d %H:%M")
    )];

    let company_discount = order.order_discount_amount + order.company_discount_total();
    if company_discount > 0.0 {
        entries.push(discount_entry(
            discount_item_sku,
            "Chiết khấu",
            -company_discount,
        ));
        notes.push(format!("Company discount {company_discount} on order {}", order.code));
    }

    let distributed = order.distributed_discount_total();
    if distributed > 0.0 {
        // Channel-funded promotions arrive VAT-inclusive and are booked
        // VAT-exclusive.
        let excl = vat_exclusive(distributed);
        entries.push(discount_entry(
            discount_item_sku,
            "Chiết khấu sàn",
            -excl,
        ));
        notes.push(format!(
            "Distributed discount {distributed} ({}) on order {}",
            order.source_name, order.code
        ));
    }

    Ok(NormalizedOrder {
        code: order.code.clone(),
        created_on: order.created_on,
        channel: order.channel,
        source_name: order.source_name.clone(),
        total: order.total,
        has_distributed_discount: order.has_distributed_discount(),
        entries,
        notes,
    })
}

fn discount_entry(sku: &str, name: &str, amount: f64) -> BillableEntry {
    BillableEntry {
        kind: EntryKind::OrderDiscount,
        sku: sku.to_string(),
        product_name: name.to_string(),
        unit: None,
        quantity: 1,
        unit_price: 0.0,
        discount_rate: 0.0,
        amount,
        tax_amount: 0.0,
        promotional: false,
    }
}

fn vat_exclusive(amount: f64) -> f64 {
    let excl = Decimal::from_f64_retain(amount).unwrap_or_default() / Decimal::new(11, 1);
    excl.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Distribute a combo's total tax across its freshly pushed component rows,
/// proportional to base value, with the remainder on the last row so the
/// row taxes always sum back to the line tax.
fn spread_tax(entries: &mut [BillableEntry], line_tax: f64, sub_count: usize) {
    let start = entries.len() - sub_count;
    let rows = &mut entries[start..];
    let base_total: f64 = rows.iter().map(|r| r.amount).sum();
    if base_total <= 0.0 {
        if let Some(last) = rows.last_mut() {
            last.tax_amount = line_tax;
        }
        return;
    }

    let mut assigned = Decimal::ZERO;
    let line_tax_dec = Decimal::from_f64_retain(line_tax).unwrap_or_default();
    let count = rows.len();
    for (index, row) in rows.iter_mut().enumerate() {
        if index + 1 == count {
            row.tax_amount = (line_tax_dec - assigned).to_f64().unwrap_or_default();
        } else {
            let share = Decimal::from_f64_retain(line_tax * row.amount / base_total)
                .unwrap_or_default()
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            assigned += share;
            row.tax_amount = share.to_f64().unwrap_or_default();
        }
    }
}
