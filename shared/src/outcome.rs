//! Per-order submission outcomes and the run-level report.

use serde::{Deserialize, Serialize};

use crate::order::Order;

/// Result of one submission attempt for one order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionOutcome {
    pub code: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SubmissionOutcome {
    pub fn handled(code: impl Into<String>) -> Self {
        Self { code: code.into(), success: true, reason: None }
    }

    pub fn failed(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            success: false,
            reason: Some(reason.into()),
        }
    }
}

/// An order that remained outside the handled set after all attempts,
/// together with the last failure cause. Nothing fails silently: every
/// order is either handled or listed here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnresolvedOrder {
    pub order: Order,
    pub reason: String,
}

/// Operator-facing summary of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RunReport {
    /// Attempts actually executed (≤ the configured maximum).
    pub attempts: u32,
    /// Codes of orders confirmed submitted.
    pub handled: Vec<String>,
    /// Orders still requiring resubmission, with causes.
    pub unresolved: Vec<UnresolvedOrder>,
}

impl RunReport {
    pub fn is_converged(&self) -> bool {
        self.unresolved.is_empty()
    }
}
