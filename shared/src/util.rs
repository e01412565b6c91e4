//! Small cross-cutting helpers.

use rust_decimal::prelude::*;

/// Current UTC timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Format a monetary amount the way the destination ledger UI displays it:
/// rounded to whole units, thousands grouped with `.` (e.g. `1.234.567`).
pub fn money_text(amount: f64) -> String {
    let rounded = Decimal::from_f64(amount)
        .unwrap_or_default()
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative();
    let digits = rounded.abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative { format!("-{grouped}") } else { grouped }
}

/// Parse a ledger-formatted money string (`1.234.567`) back to a number.
pub fn parse_money_text(text: &str) -> Option<f64> {
    text.trim().replace('.', "").parse::<f64>().ok()
}
