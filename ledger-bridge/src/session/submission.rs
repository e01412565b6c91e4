//! Sequential chunk processing against one owned entry form.

use std::collections::HashSet;
use std::sync::Arc;

use shared::util::{money_text, now_millis};
use shared::SubmissionOutcome;
use tracing::{debug, info, warn};

use super::{DocumentKind, FormError, LedgerEntryForm, LineColumn};
use crate::core::Config;
use crate::pricing::{reconcile_document_total, EntryKind, NormalizedOrder};
use crate::utils::{SyncError, SyncResult};

// ============================================================================
// Session state machine
// ============================================================================

/// Where a session currently stands. One loop per order:
/// `Idle → Authenticated → OnEntryForm → LineFilled → Saved → Idle`, with a
/// recovery edge back to `OnEntryForm` on an order-scoped failure and a
/// terminal `Aborted` on session failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Authenticated,
    OnEntryForm,
    LineFilled,
    Saved,
    Aborted,
}

/// Outcome of one session's chunk: one [`SubmissionOutcome`] per order, in
/// processing order.
#[derive(Debug, Default)]
pub struct ChunkResult {
    pub outcomes: Vec<SubmissionOutcome>,
}

impl ChunkResult {
    pub fn all_failed(orders: &[NormalizedOrder], reason: &str) -> Self {
        Self {
            outcomes: orders
                .iter()
                .map(|o| SubmissionOutcome::failed(&o.code, reason))
                .collect(),
        }
    }

    pub fn handled_codes(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.success)
            .map(|o| o.code.as_str())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter(|o| !o.success).map(|o| {
            (
                o.code.as_str(),
                o.reason.as_deref().unwrap_or("unknown failure"),
            )
        })
    }
}

// ============================================================================
// Submission session
// ============================================================================

/// Drives one chunk of normalized orders through one entry form.
pub struct SubmissionSession {
    config: Arc<Config>,
    form: Box<dyn LedgerEntryForm>,
    state: SessionState,
}

impl SubmissionSession {
    pub fn new(config: Arc<Config>, form: Box<dyn LedgerEntryForm>) -> Self {
        Self {
            config,
            form,
            state: SessionState::Idle,
        }
    }

    /// Process the chunk strictly in order. One bad order is recorded and
    /// skipped; a session-level failure condemns everything not yet handled.
    pub async fn process(mut self, orders: Vec<NormalizedOrder>) -> ChunkResult {
        let mut result = ChunkResult::default();

        if let Err(err) = self.form.authenticate().await {
            let reason = err.to_string();
            warn!(error = %reason, "authentication failed, aborting chunk");
            self.transition(SessionState::Aborted);
            return ChunkResult::all_failed(&orders, &reason);
        }
        self.transition(SessionState::Authenticated);

        let mut pending = orders.into_iter();
        for order in pending.by_ref() {
            let code = order.code.clone();
            match self.enter_order(&order).await {
                Ok(()) => {
                    info!(order = %code, "order saved");
                    result.outcomes.push(SubmissionOutcome::handled(code));
                    self.transition(SessionState::Idle);
                }
                Err(err) if err.is_order_scoped() => {
                    warn!(order = %code, error = %err, "order failed, continuing chunk");
                    result
                        .outcomes
                        .push(SubmissionOutcome::failed(code, err.to_string()));
                    if self.recover().await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    self.transition(SessionState::Aborted);
                    result
                        .outcomes
                        .push(SubmissionOutcome::failed(code, err.to_string()));
                    break;
                }
            }
        }

        // Aborted mid-chunk: everything unprocessed fails with the session
        // cause so no order disappears silently.
        if self.state == SessionState::Aborted {
            let reason = result
                .outcomes
                .last()
                .and_then(|o| o.reason.clone())
                .unwrap_or_else(|| "session aborted".into());
            for order in pending {
                result
                    .outcomes
                    .push(SubmissionOutcome::failed(order.code, reason.clone()));
            }
        }

        if let Err(err) = self.form.close().await {
            warn!(error = %err, "form close failed");
        }
        result
    }

    /// Enter one order: sales invoice first, then the matching warehouse
    /// export document.
    async fn enter_order(&mut self, order: &NormalizedOrder) -> SyncResult<()> {
        self.enter_invoice(order).await?;
        self.enter_warehouse_export(order).await?;
        Ok(())
    }

    async fn enter_invoice(&mut self, order: &NormalizedOrder) -> SyncResult<()> {
        let code = &order.code;
        self.open(code, DocumentKind::SalesInvoice).await?;

        let customer = self.labeled(order.customer_label());
        self.header(code, "customer", &customer).await?;
        self.header(code, "reference", code).await?;
        self.header(code, "date", &order.created_on.format("%d/%m/%Y").to_string())
            .await?;

        // Track discount rows so the balancing fixup can rewrite one later.
        let mut discount_row: Option<(usize, f64)> = None;
        let mut seen_skus = HashSet::new();

        for entry in &order.entries {
            if entry.kind == EntryKind::Item && !seen_skus.insert(entry.sku.clone()) {
                debug!(order = %code, sku = %entry.sku, "duplicate SKU row in document");
            }
            let row = self.row(code).await?;
            self.cell(code, row, LineColumn::Sku, &entry.sku).await?;

            match entry.kind {
                EntryKind::Item => {
                    self.cell(code, row, LineColumn::Quantity, &entry.quantity.to_string())
                        .await?;
                    self.cell(code, row, LineColumn::UnitPrice, &money_text(entry.unit_price))
                        .await?;
                    self.cell(
                        code,
                        row,
                        LineColumn::DiscountRate,
                        &format!("{:.2}", entry.discount_rate),
                    )
                    .await?;
                    if entry.promotional {
                        self.cell(code, row, LineColumn::Promotion, "1").await?;
                    }
                }
                EntryKind::OrderDiscount => {
                    self.cell(code, row, LineColumn::DiscountValue, &money_text(entry.amount))
                        .await?;
                    self.cell(code, row, LineColumn::Note, &entry.product_name)
                        .await?;
                    discount_row = Some((row, entry.amount));
                }
            }

            // The destination validates SKUs as they are entered; a marked
            // row means this order can never save in its current shape.
            if self.line_error(code, row).await? {
                return Err(SyncError::entry(
                    code,
                    format!("destination rejected row for SKU {}", entry.sku),
                ));
            }
        }
        self.transition(SessionState::LineFilled);

        for note in &order.notes {
            self.form
                .append_note(note)
                .await
                .map_err(|e| self.classify(code, e))?;
        }

        self.balance(order, discount_row).await?;

        self.form.save().await.map_err(|e| self.classify(code, e))?;
        self.transition(SessionState::Saved);
        Ok(())
    }

    /// Compare the displayed total against the channel total and absorb
    /// rounding drift into the discount row.
    async fn balance(
        &mut self,
        order: &NormalizedOrder,
        discount_row: Option<(usize, f64)>,
    ) -> SyncResult<()> {
        let code = &order.code;
        let displayed = self
            .form
            .displayed_total()
            .await
            .map_err(|e| self.classify(code, e))?;

        let current = discount_row.map(|(_, amount)| amount).unwrap_or(0.0);
        let adjustment = reconcile_document_total(
            order.total,
            displayed,
            current,
            order.has_distributed_discount,
            self.config.balance_sanity_threshold,
        );

        if adjustment.flagged {
            return Err(SyncError::entry(
                code,
                format!(
                    "document total drift {} exceeds sanity threshold",
                    adjustment.difference
                ),
            ));
        }
        if !adjustment.applied {
            return Ok(());
        }

        debug!(
            order = %code,
            difference = adjustment.difference,
            "absorbing total drift into discount row"
        );
        let row = match discount_row {
            Some((row, _)) => row,
            None => {
                let row = self.row(code).await?;
                self.cell(code, row, LineColumn::Sku, &self.config.discount_item_sku.clone())
                    .await?;
                row
            }
        };
        self.cell(
            code,
            row,
            LineColumn::DiscountValue,
            &money_text(adjustment.new_discount_value),
        )
        .await
    }

    /// Stock movement mirror of the invoice: grouped physical quantities,
    /// stamped with a timestamped document number so reruns never collide.
    async fn enter_warehouse_export(&mut self, order: &NormalizedOrder) -> SyncResult<()> {
        let code = &order.code;
        let quantities = order.warehouse_quantities();
        if quantities.is_empty() {
            return Ok(());
        }

        self.open(code, DocumentKind::WarehouseExport).await?;
        self.header(code, "reference", code).await?;

        // The destination pre-assigns a number; a timestamp suffix on its
        // prefix keeps reruns of the same order from colliding.
        let assigned = self
            .form
            .document_number()
            .await
            .map_err(|e| self.classify(code, e))?;
        let prefix: String = assigned.chars().take(7).collect();
        let number = format!("{prefix}-{}", now_millis());
        self.form
            .set_document_number(&number)
            .await
            .map_err(|e| self.classify(code, e))?;

        for (sku, quantity) in &quantities {
            let row = self.row(code).await?;
            self.cell(code, row, LineColumn::Sku, sku).await?;
            self.cell(code, row, LineColumn::Quantity, &quantity.to_string())
                .await?;
            self.cell(
                code,
                row,
                LineColumn::Warehouse,
                &self.config.warehouse_id.clone(),
            )
            .await?;
        }

        self.form.save().await.map_err(|e| self.classify(code, e))?;
        Ok(())
    }

    /// Re-navigate after an order-scoped failure so the next order starts
    /// from a clean form.
    async fn recover(&mut self) -> SyncResult<()> {
        match self.form.close().await {
            Ok(()) | Err(FormError::Rejected(_)) | Err(FormError::Timeout(_)) => {
                self.transition(SessionState::OnEntryForm);
                Ok(())
            }
            Err(FormError::Fatal(message)) => {
                self.transition(SessionState::Aborted);
                Err(SyncError::session(message))
            }
        }
    }

    // ========== Form call wrappers ==========

    async fn open(&mut self, code: &str, kind: DocumentKind) -> SyncResult<()> {
        self.form
            .open_new_document(kind)
            .await
            .map_err(|e| self.classify(code, e))?;
        self.transition(SessionState::OnEntryForm);
        Ok(())
    }

    async fn header(&mut self, code: &str, name: &str, value: &str) -> SyncResult<()> {
        self.form
            .set_header_field(name, value)
            .await
            .map_err(|e| self.classify(code, e))
    }

    async fn row(&mut self, code: &str) -> SyncResult<usize> {
        self.form
            .add_line_row()
            .await
            .map_err(|e| self.classify(code, e))
    }

    async fn cell(
        &mut self,
        code: &str,
        row: usize,
        column: LineColumn,
        value: &str,
    ) -> SyncResult<()> {
        self.form
            .set_line_cell(row, column, value)
            .await
            .map_err(|e| self.classify(code, e))
    }

    async fn line_error(&mut self, code: &str, row: usize) -> SyncResult<bool> {
        self.form
            .has_line_error(row)
            .await
            .map_err(|e| self.classify(code, e))
    }

    fn classify(&self, code: &str, err: FormError) -> SyncError {
        match err {
            FormError::Rejected(_) | FormError::Timeout(_) => {
                SyncError::entry(code, err.to_string())
            }
            FormError::Fatal(message) => SyncError::session(message),
        }
    }

    fn labeled(&self, value: String) -> String {
        if self.config.environment.is_empty() {
            value
        } else {
            format!("[{}] {}", self.config.environment, value)
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use shared::SalesChannel;
    use std::collections::HashSet;

    use crate::pricing::BillableEntry;
    use crate::session::FormResult;

    // ========== Scripted form ==========

    /// In-memory form: validates nothing, computes the displayed total the
    /// way the destination would, and fails on command.
    #[derive(Default)]
    struct ScriptedForm {
        reject_skus: HashSet<String>,
        fatal_on_reference: Option<String>,
        current_reference: String,
        current_kind: Option<DocumentKind>,
        rows: Vec<RowState>,
        saved_invoices: Vec<String>,
        saved_exports: Vec<String>,
        notes: Vec<String>,
        document_numbers: Vec<String>,
        marked_row: Option<usize>,
    }

    #[derive(Default, Clone)]
    struct RowState {
        sku: String,
        amount: f64,
        rate: f64,
        discount_value: f64,
        quantity: i64,
        unit_price: f64,
    }

    #[async_trait]
    impl LedgerEntryForm for ScriptedForm {
        async fn authenticate(&mut self) -> FormResult<()> {
            Ok(())
        }

        async fn open_new_document(&mut self, kind: DocumentKind) -> FormResult<()> {
            self.current_kind = Some(kind);
            self.rows.clear();
            self.marked_row = None;
            Ok(())
        }

        async fn set_header_field(&mut self, name: &str, value: &str) -> FormResult<()> {
            if name == "reference" {
                if self.fatal_on_reference.as_deref() == Some(value) {
                    return Err(FormError::Fatal("connection lost".into()));
                }
                self.current_reference = value.to_string();
            }
            Ok(())
        }

        async fn add_line_row(&mut self) -> FormResult<usize> {
            self.rows.push(RowState::default());
            Ok(self.rows.len() - 1)
        }

        async fn set_line_cell(
            &mut self,
            row: usize,
            column: LineColumn,
            value: &str,
        ) -> FormResult<()> {
            let state = &mut self.rows[row];
            match column {
                LineColumn::Sku => {
                    state.sku = value.to_string();
                    if self.reject_skus.contains(value) {
                        self.marked_row = Some(row);
                    }
                }
                LineColumn::Quantity => state.quantity = value.parse().unwrap(),
                LineColumn::UnitPrice => {
                    state.unit_price = shared::util::parse_money_text(value).unwrap();
                    state.amount = state.unit_price * state.quantity as f64;
                }
                LineColumn::DiscountRate => state.rate = value.parse().unwrap(),
                LineColumn::DiscountValue => {
                    state.discount_value = shared::util::parse_money_text(value).unwrap()
                }
                _ => {}
            }
            Ok(())
        }

        async fn has_line_error(&mut self, row: usize) -> FormResult<bool> {
            Ok(self.marked_row == Some(row))
        }

        async fn append_note(&mut self, note: &str) -> FormResult<()> {
            self.notes.push(note.to_string());
            Ok(())
        }

        async fn displayed_total(&mut self) -> FormResult<f64> {
            let items: f64 = self
                .rows
                .iter()
                .map(|r| r.amount * (1.0 - r.rate / 100.0) * 1.1)
                .sum();
            let discounts: f64 = self.rows.iter().map(|r| r.discount_value).sum();
            Ok(items + discounts)
        }

        async fn document_number(&mut self) -> FormResult<String> {
            Ok("PXK00042".into())
        }

        async fn set_document_number(&mut self, number: &str) -> FormResult<()> {
            self.document_numbers.push(number.to_string());
            Ok(())
        }

        async fn save(&mut self) -> FormResult<()> {
            match self.current_kind {
                Some(DocumentKind::SalesInvoice) => {
                    self.saved_invoices.push(self.current_reference.clone())
                }
                Some(DocumentKind::WarehouseExport) => {
                    self.saved_exports.push(self.current_reference.clone())
                }
                None => return Err(FormError::Rejected("no open document".into())),
            }
            Ok(())
        }

        async fn close(&mut self) -> FormResult<()> {
            self.current_kind = None;
            Ok(())
        }
    }

    // ========== Helpers ==========

    fn item(sku: &str, quantity: i64, unit_price: f64) -> BillableEntry {
        BillableEntry {
            kind: EntryKind::Item,
            sku: sku.into(),
            product_name: sku.into(),
            unit: Some("Chai".into()),
            quantity,
            unit_price,
            discount_rate: 0.0,
            amount: unit_price * quantity as f64,
            tax_amount: unit_price * quantity as f64 * 0.1,
            promotional: false,
        }
    }

    fn order(code: &str, entries: Vec<BillableEntry>) -> NormalizedOrder {
        let total = entries
            .iter()
            .map(|e| match e.kind {
                EntryKind::Item => e.amount * (1.0 - e.discount_rate / 100.0) * 1.1,
                EntryKind::OrderDiscount => e.amount,
            })
            .sum();
        NormalizedOrder {
            code: code.into(),
            created_on: Utc::now(),
            channel: SalesChannel::Sapo,
            source_name: "Lazada".into(),
            total,
            has_distributed_discount: false,
            entries,
            notes: vec![format!("Order {code}")],
        }
    }

    fn session(form: ScriptedForm) -> SubmissionSession {
        SubmissionSession::new(Arc::new(Config::with_overrides(1, 1)), Box::new(form))
    }

    // ========== Tests ==========

    #[tokio::test]
    async fn clean_chunk_is_fully_handled_in_order() {
        let orders = vec![
            order("SON01", vec![item("S1", 1, 1000.0)]),
            order("SON02", vec![item("S2", 2, 2000.0)]),
        ];
        let result = session(ScriptedForm::default()).process(orders).await;

        let handled: Vec<&str> = result.handled_codes().collect();
        assert_eq!(handled, vec!["SON01", "SON02"]);
        assert_eq!(result.failures().count(), 0);
    }

    #[tokio::test]
    async fn rejected_sku_fails_that_order_only() {
        let form = ScriptedForm {
            reject_skus: HashSet::from(["BAD".to_string()]),
            ..Default::default()
        };
        let orders = vec![
            order("SON01", vec![item("S1", 1, 1000.0)]),
            order("SON02", vec![item("BAD", 1, 500.0)]),
            order("SON03", vec![item("S2", 1, 2000.0)]),
        ];
        let result = session(form).process(orders).await;

        let handled: Vec<&str> = result.handled_codes().collect();
        assert_eq!(handled, vec!["SON01", "SON03"]);
        let failures: Vec<(&str, &str)> = result.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "SON02");
        assert!(failures[0].1.contains("BAD"));
    }

    #[tokio::test]
    async fn fatal_failure_condemns_the_rest_of_the_chunk() {
        let form = ScriptedForm {
            fatal_on_reference: Some("SON02".into()),
            ..Default::default()
        };
        let orders = vec![
            order("SON01", vec![item("S1", 1, 1000.0)]),
            order("SON02", vec![item("S2", 1, 2000.0)]),
            order("SON03", vec![item("S1", 1, 1000.0)]),
        ];
        let result = session(form).process(orders).await;

        let handled: Vec<&str> = result.handled_codes().collect();
        assert_eq!(handled, vec!["SON01"]);
        let failed: Vec<&str> = result.failures().map(|(code, _)| code).collect();
        assert_eq!(failed, vec!["SON02", "SON03"]);
    }

    #[tokio::test]
    async fn saving_an_order_produces_both_documents() {
        let orders = vec![order("SON06789", vec![item("S1", 2, 1000.0)])];
        let config = Arc::new(Config::with_overrides(1, 1));
        let session = SubmissionSession::new(
            config,
            Box::new(ScriptedForm::default()),
        );
        let result = session.process(orders).await;
        assert_eq!(result.handled_codes().collect::<Vec<_>>(), vec!["SON06789"]);
    }

    #[tokio::test]
    async fn total_drift_is_absorbed_into_the_discount_row() {
        // Item total 1100, discount -200 entered, so displayed = 900.
        // The order claims 902: drift of 2 must land in the discount cell.
        let mut o = order("SON05", vec![item("S1", 1, 1000.0)]);
        o.entries.push(BillableEntry {
            kind: EntryKind::OrderDiscount,
            sku: "CK".into(),
            product_name: "Chiết khấu".into(),
            unit: None,
            quantity: 1,
            unit_price: 0.0,
            discount_rate: 0.0,
            amount: -200.0,
            tax_amount: 0.0,
            promotional: false,
        });
        o.total = 902.0;

        let result = session(ScriptedForm::default()).process(vec![o]).await;
        assert_eq!(result.handled_codes().collect::<Vec<_>>(), vec!["SON05"]);
    }

    #[tokio::test]
    async fn huge_drift_fails_the_order_instead_of_patching() {
        let mut o = order("SON06", vec![item("S1", 1, 1000.0)]);
        // Claims a total wildly off what the rows produce.
        o.total = 50_000.0;

        let result = session(ScriptedForm::default()).process(vec![o]).await;
        assert_eq!(result.handled_codes().count(), 0);
        let failures: Vec<(&str, &str)> = result.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains("drift"));
    }
}
