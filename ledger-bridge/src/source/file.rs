//! File-backed order source.
//!
//! Reads a JSON export of channel orders (a plain array) from disk. Handy
//! for replaying a day's orders or feeding the dry-run form.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::Order;

use super::OrderSource;
use crate::utils::{SyncError, SyncResult};

pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> SyncResult<Vec<Order>> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            SyncError::config(format!(
                "cannot read orders file {}: {e}",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            SyncError::config(format!(
                "invalid orders file {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl OrderSource for JsonFileSource {
    async fn fetch_by_date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SyncResult<Vec<Order>> {
        let orders = self.load()?;
        Ok(orders
            .into_iter()
            .filter(|o| o.created_on >= from && o.created_on <= to)
            .collect())
    }

    async fn fetch_by_codes(&self, codes: &[String]) -> SyncResult<Vec<Order>> {
        let orders = self.load()?;
        Ok(orders
            .into_iter()
            .filter(|o| codes.iter().any(|c| c == &o.code))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn orders_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"code": "SON01", "created_on": "2025-03-01T10:00:00Z",
                  "channel": "SAPO", "source_name": "Lazada", "total": 1100.0,
                  "lines": [{{"sku": "S1", "product_name": "Fish sauce",
                              "quantity": 1, "sale_price": 1100.0}}]}},
                {{"code": "SON02", "created_on": "2025-03-05T10:00:00Z",
                  "channel": "WEB", "source_name": "giangs.vn", "total": 2200.0,
                  "lines": [{{"sku": "S2", "product_name": "Chili sauce",
                              "quantity": 1, "sale_price": 2200.0}}]}}
            ]"#
        )
        .unwrap();
        file
    }

    fn date(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn date_range_bounds_are_inclusive() {
        let file = orders_file();
        let source = JsonFileSource::new(file.path());

        let hits = source
            .fetch_by_date_range(date("2025-03-01T10:00:00Z"), date("2025-03-05T10:00:00Z"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = source
            .fetch_by_date_range(date("2025-03-02T00:00:00Z"), date("2025-03-04T00:00:00Z"))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn unknown_codes_are_skipped() {
        let file = orders_file();
        let source = JsonFileSource::new(file.path());

        let hits = source
            .fetch_by_codes(&["SON02".into(), "GHOST".into()])
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "SON02");
    }
}
