//! Dry-run form.
//!
//! Stands in for the real destination client: accepts every call, emulates
//! the destination's total computation, and logs what would have been
//! entered. Used for rehearsing a batch without touching the ledger.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{DocumentKind, FormError, FormFactory, FormResult, LedgerEntryForm};
use crate::utils::SyncResult;
use shared::util::parse_money_text;

#[derive(Default)]
pub struct DryRunForm {
    reference: String,
    rows: Vec<Row>,
    open: bool,
}

#[derive(Default)]
struct Row {
    sku: String,
    quantity: i64,
    unit_price: f64,
    rate: f64,
    discount_value: f64,
}

#[async_trait]
impl LedgerEntryForm for DryRunForm {
    async fn authenticate(&mut self) -> FormResult<()> {
        debug!("dry-run authenticate");
        Ok(())
    }

    async fn open_new_document(&mut self, kind: DocumentKind) -> FormResult<()> {
        debug!(?kind, "dry-run open document");
        self.rows.clear();
        self.open = true;
        Ok(())
    }

    async fn set_header_field(&mut self, name: &str, value: &str) -> FormResult<()> {
        if name == "reference" {
            self.reference = value.to_string();
        }
        Ok(())
    }

    async fn add_line_row(&mut self) -> FormResult<usize> {
        self.rows.push(Row::default());
        Ok(self.rows.len() - 1)
    }

    async fn set_line_cell(
        &mut self,
        row: usize,
        column: super::LineColumn,
        value: &str,
    ) -> FormResult<()> {
        let state = self
            .rows
            .get_mut(row)
            .ok_or_else(|| FormError::Rejected(format!("no row {row}")))?;
        use super::LineColumn::*;
        match column {
            Sku => state.sku = value.to_string(),
            Quantity => state.quantity = value.parse().unwrap_or_default(),
            UnitPrice => state.unit_price = parse_money_text(value).unwrap_or_default(),
            DiscountRate => state.rate = value.parse().unwrap_or_default(),
            DiscountValue => state.discount_value = parse_money_text(value).unwrap_or_default(),
            _ => {}
        }
        Ok(())
    }

    async fn has_line_error(&mut self, _row: usize) -> FormResult<bool> {
        Ok(false)
    }

    async fn append_note(&mut self, note: &str) -> FormResult<()> {
        debug!(note, "dry-run note");
        Ok(())
    }

    async fn displayed_total(&mut self) -> FormResult<f64> {
        let items: f64 = self
            .rows
            .iter()
            .map(|r| r.unit_price * r.quantity as f64 * (1.0 - r.rate / 100.0) * 1.1)
            .sum();
        let discounts: f64 = self.rows.iter().map(|r| r.discount_value).sum();
        Ok(items + discounts)
    }

    async fn document_number(&mut self) -> FormResult<String> {
        Ok(format!("DRY{:04}", self.rows.len()))
    }

    async fn set_document_number(&mut self, number: &str) -> FormResult<()> {
        debug!(number, "dry-run document number");
        Ok(())
    }

    async fn save(&mut self) -> FormResult<()> {
        if !self.open {
            return Err(FormError::Rejected("no open document".into()));
        }
        info!(
            reference = %self.reference,
            rows = self.rows.len(),
            "dry-run save"
        );
        self.open = false;
        Ok(())
    }

    async fn close(&mut self) -> FormResult<()> {
        self.open = false;
        self.rows.clear();
        Ok(())
    }
}

/// Hands every session a fresh [`DryRunForm`].
#[derive(Default)]
pub struct DryRunFormFactory;

#[async_trait]
impl FormFactory for DryRunFormFactory {
    async fn create(&self) -> SyncResult<Box<dyn LedgerEntryForm>> {
        Ok(Box::new(DryRunForm::default()))
    }
}
