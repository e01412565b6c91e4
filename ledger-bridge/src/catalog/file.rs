//! File-backed catalog.
//!
//! Loads the full SKU table from a JSON export once at startup and serves
//! lookups from memory. The export is a plain array of catalog entries.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use shared::CatalogEntry;

use super::CatalogLookup;
use crate::utils::{SyncError, SyncResult};

#[derive(Debug)]
pub struct FileCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl FileCatalog {
    /// Load the catalog export at `path`.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SyncError::config(format!("cannot read catalog file {}: {e}", path.display()))
        })?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw).map_err(|e| {
            SyncError::config(format!("invalid catalog file {}: {e}", path.display()))
        })?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.sku.clone(), e)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CatalogLookup for FileCatalog {
    async fn lookup(&self, sku: &str) -> SyncResult<Option<CatalogEntry>> {
        Ok(self.entries.get(sku).cloned())
    }
}
