//! Document-total balancing fixup.
//!
//! After a form is populated, rounding drift across the many per-row
//! divisions can leave the displayed document total a few units off the
//! channel's recorded total. The drift is absorbed into the designated
//! discount row. Drift above a sanity threshold is refused instead, because
//! a large difference means a pricing bug, not rounding.

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceAdjustment {
    /// Whether the discount value should be rewritten.
    pub applied: bool,
    /// The corrected value for the discount cell when `applied`.
    pub new_discount_value: f64,
    /// Absolute drift between recorded and displayed totals.
    pub difference: f64,
    /// Drift exceeded the sanity threshold and was refused.
    pub flagged: bool,
}

/// Compare the channel's recorded order total against the total the form
/// displays, and compute the corrective change to the discount cell.
///
/// With a distributed discount present the discount cell holds a
/// VAT-exclusive value while both totals are VAT-inclusive, so the corrected
/// sum is divided by 1.1; otherwise it is applied unscaled.
pub fn reconcile_document_total(
    order_total: f64,
    displayed_total: f64,
    current_discount_value: f64,
    has_distributed_discount: bool,
    sanity_threshold: f64,
) -> BalanceAdjustment {
    let signed = order_total - displayed_total;
    let difference = signed.abs();

    if difference == 0.0 {
        return BalanceAdjustment {
            applied: false,
            new_discount_value: current_discount_value,
            difference,
            flagged: false,
        };
    }

    if difference > sanity_threshold {
        warn!(
            difference,
            sanity_threshold,
            "document total drift exceeds threshold, refusing fixup"
        );
        return BalanceAdjustment {
            applied: false,
            new_discount_value: current_discount_value,
            difference,
            flagged: true,
        };
    }

    let corrected = current_discount_value + signed;
    let new_discount_value = if has_distributed_discount {
        corrected / 1.1
    } else {
        corrected
    };
    BalanceAdjustment {
        applied: true,
        new_discount_value,
        difference,
        flagged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_totals_need_no_fixup() {
        let adj = reconcile_document_total(3960.0, 3960.0, -200.0, false, 1000.0);
        assert!(!adj.applied);
        assert!(!adj.flagged);
        assert_eq!(adj.new_discount_value, -200.0);
    }

    #[test]
    fn small_drift_is_absorbed_into_the_discount_cell() {
        // Displayed 2 short of recorded: discount row gains 2.
        let adj = reconcile_document_total(3960.0, 3958.0, -200.0, false, 1000.0);
        assert!(adj.applied);
        assert_eq!(adj.difference, 2.0);
        assert_eq!(adj.new_discount_value, -198.0);
    }

    #[test]
    fn distributed_discount_divides_corrected_value_by_vat() {
        let adj = reconcile_document_total(3960.0, 3949.0, -200.0, true, 1000.0);
        assert!(adj.applied);
        assert_eq!(adj.difference, 11.0);
        // (-200 + 11) / 1.1 = -171.81..., the VAT-exclusive cell value.
        assert!((adj.new_discount_value - (-189.0 / 1.1)).abs() < 1e-9);
    }

    #[test]
    fn displayed_above_recorded_deepens_the_discount() {
        let adj = reconcile_document_total(3960.0, 3965.0, -200.0, false, 1000.0);
        assert!(adj.applied);
        assert_eq!(adj.new_discount_value, -205.0);
    }

    #[test]
    fn drift_over_threshold_is_flagged_not_applied() {
        let adj = reconcile_document_total(3960.0, 1000.0, -200.0, false, 1000.0);
        assert!(!adj.applied);
        assert!(adj.flagged);
        assert_eq!(adj.new_discount_value, -200.0);
    }
}
