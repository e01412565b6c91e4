//! Shared domain models for the order-sync engine.
//!
//! Everything a source channel adapter, the pricing engine, and the ledger
//! submission layer agree on lives here: the ingested [`order::Order`] model,
//! destination-catalog reference data, and per-order submission outcomes.

pub mod catalog;
pub mod order;
pub mod outcome;
pub mod util;

pub use catalog::{BundleComponent, CatalogEntry};
pub use order::{CustomerSummary, Order, OrderLine, SalesChannel, SubLine};
pub use outcome::{RunReport, SubmissionOutcome, UnresolvedOrder};
