//! Order Sources
//!
//! Ingestion boundary. Channel-specific pagination and auth live behind
//! [`OrderSource`]; the engine only sees fully formed [`Order`] values.

mod file;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::Order;

use crate::utils::SyncResult;

pub use file::JsonFileSource;

/// A source channel the engine can pull orders from.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Orders created within `[from, to]`, both bounds inclusive.
    async fn fetch_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SyncResult<Vec<Order>>;

    /// Orders matching the given channel codes. Unknown codes are skipped,
    /// not an error.
    async fn fetch_by_codes(&self, codes: &[String]) -> SyncResult<Vec<Order>>;
}
