//! Submission Sessions
//!
//! One session drives one chunk of orders, sequentially, against an
//! exclusively owned ledger entry form. The form itself is a capability set
//! behind [`LedgerEntryForm`]; how fields are located inside the destination
//! system is not this crate's concern.

mod dry_run;
mod submission;

use async_trait::async_trait;

use crate::utils::SyncResult;

pub use dry_run::{DryRunForm, DryRunFormFactory};
pub use submission::{ChunkResult, SessionState, SubmissionSession};

// ============================================================================
// Form capability set
// ============================================================================

/// Document types the engine creates per order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// The accounting document carrying priced rows and discounts.
    SalesInvoice,
    /// The stock movement document carrying physical quantities.
    WarehouseExport,
}

/// Addressable cells of one document line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineColumn {
    Sku,
    Quantity,
    UnitPrice,
    Amount,
    DiscountRate,
    DiscountValue,
    /// Promotion flag cell for free or fully discounted rows.
    Promotion,
    /// Warehouse code cell on export-document rows.
    Warehouse,
    Note,
}

/// Form-level failures, classified by blast radius.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// The destination rejected an entered value. Current order only.
    #[error("rejected by destination: {0}")]
    Rejected(String),
    /// An expected element never became ready within the wait budget.
    /// Current order only.
    #[error("timed out waiting for {0}")]
    Timeout(String),
    /// The session itself is broken (authentication, navigation). The
    /// remaining chunk cannot proceed.
    #[error("session failure: {0}")]
    Fatal(String),
}

pub type FormResult<T> = Result<T, FormError>;

/// Capability set of one exclusively owned entry form.
///
/// All methods take `&mut self`: a form is never shared between sessions,
/// ownership passes into exactly one [`SubmissionSession`].
#[async_trait]
pub trait LedgerEntryForm: Send {
    /// Sign in to the destination system.
    async fn authenticate(&mut self) -> FormResult<()>;

    /// Navigate to a fresh document of the given kind.
    async fn open_new_document(&mut self, kind: DocumentKind) -> FormResult<()>;

    async fn set_header_field(&mut self, name: &str, value: &str) -> FormResult<()>;

    /// Append an empty line and return its row index.
    async fn add_line_row(&mut self) -> FormResult<usize>;

    async fn set_line_cell(&mut self, row: usize, column: LineColumn, value: &str)
        -> FormResult<()>;

    /// Whether the destination marked the row invalid (unknown SKU etc.).
    async fn has_line_error(&mut self, row: usize) -> FormResult<bool>;

    /// Append to the document's free-text appendix.
    async fn append_note(&mut self, note: &str) -> FormResult<()>;

    /// Document total as currently displayed by the destination.
    async fn displayed_total(&mut self) -> FormResult<f64>;

    /// Document number the destination pre-assigned to the open document.
    async fn document_number(&mut self) -> FormResult<String>;

    async fn set_document_number(&mut self, number: &str) -> FormResult<()>;

    /// Persist the open document.
    async fn save(&mut self) -> FormResult<()>;

    /// Discard any open document and release the form's resources.
    async fn close(&mut self) -> FormResult<()>;
}

/// Builds one fresh form per session. The factory is shared across the run;
/// each produced form is owned by exactly one session.
#[async_trait]
pub trait FormFactory: Send + Sync {
    async fn create(&self) -> SyncResult<Box<dyn LedgerEntryForm>>;
}
