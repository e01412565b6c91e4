//! Order synchronization and ledger-entry engine.
//!
//! Pulls sales orders from a source channel, resolves them against the
//! destination catalog, prices and normalizes every line, and submits the
//! batch as accounting documents through parallel retry-bounded entry
//! sessions.

pub mod batch;
pub mod catalog;
pub mod controller;
pub mod core;
pub mod pricing;
pub mod session;
pub mod source;
pub mod utils;

pub use crate::controller::ReconciliationController;
pub use crate::core::Config;
pub use crate::utils::{SyncError, SyncResult};
