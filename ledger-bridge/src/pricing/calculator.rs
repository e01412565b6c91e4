//! Per-line discount and tax arithmetic.
//!
//! All money math runs on `Decimal` and converts back to `f64` only at the
//! edges. Sale prices are VAT-inclusive, catalog base prices VAT-exclusive,
//! VAT is a fixed 10%.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use shared::OrderLine;
use tracing::warn;

use crate::utils::{SyncError, SyncResult};

// ============================================================================
// Decimal helpers
// ============================================================================

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or_default()
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// 1.1, the factor between VAT-inclusive and VAT-exclusive money.
fn vat_factor() -> Decimal {
    Decimal::new(11, 1)
}

/// The destination ledger's fixed 10% VAT.
fn vat_rate() -> Decimal {
    Decimal::new(1, 1)
}

// ============================================================================
// Rate / tax formulas
// ============================================================================

/// Discount rate in percent of `sale_value` (VAT-inclusive) against
/// `base_value` (VAT-exclusive), rounded to 2 decimal places.
///
/// `rate = (base - sale/1.1) / base * 100`
///
/// A non-positive base means the catalog knows no reference price; the line
/// is treated as fully promotional (rate 100). A negative rate (sale above
/// base × 1.1) is passed through unchanged so it stays visible downstream.
fn discount_rate(base_value: Decimal, sale_value: Decimal) -> Decimal {
    if base_value <= Decimal::ZERO {
        return Decimal::ONE_HUNDRED;
    }
    round2((base_value - sale_value / vat_factor()) / base_value * Decimal::ONE_HUNDRED)
}

/// VAT amount for one priced position:
/// `(base - base × rate/100) × quantity × 0.10`, rounded to 2 dp.
fn tax_amount(base_price: Decimal, rate: Decimal, quantity: i64) -> Decimal {
    let discounted = base_price - base_price * rate / Decimal::ONE_HUNDRED;
    round2(discounted * Decimal::from(quantity) * vat_rate())
}

/// Free and 100%-discounted positions both raise the ledger's promotion
/// flag; they are one category until the business says otherwise.
pub fn is_promotional(rate: f64, unit_price: f64) -> bool {
    rate >= 100.0 || unit_price <= 0.0
}

// ============================================================================
// Line pricing
// ============================================================================

/// Fill `discount_rate` and `tax_amount` on a resolved line.
///
/// Simple lines are rated against their catalog base price. Composite lines
/// are rated against the sum of sub-line base values, and the parent rate is
/// mirrored onto every sub-line before computing per-sub taxes.
pub fn price_line(code: &str, line: &mut OrderLine) -> SyncResult<()> {
    if line.is_composite {
        price_composite(code, line)
    } else {
        price_simple(code, line)
    }
}

fn price_simple(code: &str, line: &mut OrderLine) -> SyncResult<()> {
    let base = line
        .base_price
        .ok_or_else(|| SyncError::entry(code, format!("line {} was not resolved", line.sku)))?;

    let base = to_decimal(base);
    let rate = discount_rate(base, to_decimal(line.sale_price));
    if rate < Decimal::ZERO {
        warn!(
            order = code,
            sku = %line.sku,
            rate = %rate,
            "sale price above catalog base, negative discount rate"
        );
    }
    line.discount_rate = to_f64(rate);
    line.tax_amount = to_f64(tax_amount(base, rate, line.quantity));
    Ok(())
}

fn price_composite(code: &str, line: &mut OrderLine) -> SyncResult<()> {
    if line.sub_lines.is_empty() {
        return Err(SyncError::entry(
            code,
            format!("composite line {} has no sub-lines", line.sku),
        ));
    }

    // Parent rate is computed against the aggregate of sub-line base
    // values, not the parent's nominal price.
    let base_total: Decimal = line
        .sub_lines
        .iter()
        .map(|s| to_decimal(s.price) * Decimal::from(s.quantity))
        .sum();
    let sale_value = to_decimal(line.sale_price) * Decimal::from(line.quantity);

    let rate = discount_rate(base_total, sale_value);
    if rate < Decimal::ZERO {
        warn!(
            order = code,
            sku = %line.sku,
            rate = %rate,
            "combo sale price above component base total, negative discount rate"
        );
    }
    line.discount_rate = to_f64(rate);

    let mut total_tax = Decimal::ZERO;
    for sub in &mut line.sub_lines {
        sub.discount_rate = to_f64(rate);
        total_tax += tax_amount(to_decimal(sub.price), rate, sub.quantity);
    }
    line.tax_amount = to_f64(total_tax);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SubLine;

    fn resolved_simple(base: f64, sale: f64, qty: i64) -> OrderLine {
        let mut line = OrderLine::simple("S1", qty, sale);
        line.base_price = Some(base);
        line
    }

    #[test]
    fn simple_rate_against_catalog_base() {
        // base 1000, sale 990 incl. VAT: 990 / 1.1 = 900
        // rate = (1000 - 900) / 1000 * 100 = 10.00
        let mut line = resolved_simple(1000.0, 990.0, 3);
        price_line("SON01", &mut line).unwrap();
        assert_eq!(line.discount_rate, 10.0);
        // tax = (1000 - 100) * 3 * 0.1 = 270
        assert_eq!(line.tax_amount, 270.0);
    }

    #[test]
    fn undiscounted_simple_line_has_zero_rate() {
        let mut line = resolved_simple(1000.0, 1100.0, 1);
        price_line("SON01", &mut line).unwrap();
        assert_eq!(line.discount_rate, 0.0);
        assert_eq!(line.tax_amount, 100.0);
    }

    #[test]
    fn sale_above_base_yields_negative_rate_not_error() {
        // sale 1320 / 1.1 = 1200 against base 1000 -> rate -20
        let mut line = resolved_simple(1000.0, 1320.0, 1);
        price_line("SON01", &mut line).unwrap();
        assert_eq!(line.discount_rate, -20.0);
        assert!(!is_promotional(line.discount_rate, line.sale_price));
    }

    #[test]
    fn zero_base_is_promotional() {
        let mut line = resolved_simple(0.0, 500.0, 1);
        price_line("SON01", &mut line).unwrap();
        assert_eq!(line.discount_rate, 100.0);
        assert!(is_promotional(line.discount_rate, line.sale_price));
        assert_eq!(line.tax_amount, 0.0);
    }

    #[test]
    fn unresolved_simple_line_is_an_entry_error() {
        let mut line = OrderLine::simple("S1", 1, 990.0);
        let err = price_line("SON01", &mut line).unwrap_err();
        assert!(matches!(err, SyncError::Entry { .. }));
    }

    #[test]
    fn combo_rated_against_component_base_total() {
        // B1 = 2 × S1 (1000) + 1 × S2 (2000), base total 4000.
        // sale 3960 incl. VAT -> 3600 excl. -> rate = (4000-3600)/4000*100 = 10
        let mut line = OrderLine::composite(
            "B1",
            1,
            3960.0,
            vec![
                SubLine {
                    sku: "S1".into(),
                    quantity: 2,
                    price: 1000.0,
                    ..Default::default()
                },
                SubLine {
                    sku: "S2".into(),
                    quantity: 1,
                    price: 2000.0,
                    ..Default::default()
                },
            ],
        );
        price_line("SON01", &mut line).unwrap();

        assert_eq!(line.discount_rate, 10.0);
        assert_eq!(line.sub_lines[0].discount_rate, 10.0);
        assert_eq!(line.sub_lines[1].discount_rate, 10.0);
        // tax = (1000-100)*2*0.1 + (2000-200)*1*0.1 = 180 + 180 = 360
        assert_eq!(line.tax_amount, 360.0);
    }

    #[test]
    fn combo_quantity_scales_sale_value_and_tax() {
        // Two bundles: sub quantities already multiplied out by the resolver.
        let mut line = OrderLine::composite(
            "B1",
            2,
            3960.0,
            vec![
                SubLine {
                    sku: "S1".into(),
                    quantity: 4,
                    price: 1000.0,
                    ..Default::default()
                },
                SubLine {
                    sku: "S2".into(),
                    quantity: 2,
                    price: 2000.0,
                    ..Default::default()
                },
            ],
        );
        price_line("SON01", &mut line).unwrap();

        // base total 8000, sale 7920 -> 7200 excl. -> rate 10, tax 720.
        assert_eq!(line.discount_rate, 10.0);
        assert_eq!(line.tax_amount, 720.0);
    }

    #[test]
    fn empty_composite_is_rejected() {
        let mut line = OrderLine::composite("B1", 1, 3960.0, vec![]);
        let err = price_line("SON01", &mut line).unwrap_err();
        assert!(matches!(err, SyncError::Entry { .. }));
    }
}
