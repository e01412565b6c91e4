//! Line Pricing Engine
//!
//! Turns resolved orders into the normalized billable entries the ledger
//! entry form is filled from: per-line discount rates against catalog base
//! prices, per-sub-item VAT amounts, synthetic whole-order discount rows,
//! and the document-total balancing fixup.

mod balance;
mod calculator;
mod normalizer;

pub use balance::{reconcile_document_total, BalanceAdjustment};
pub use calculator::{is_promotional, price_line};
pub use normalizer::{normalize_order, BillableEntry, EntryKind, NormalizedOrder};
