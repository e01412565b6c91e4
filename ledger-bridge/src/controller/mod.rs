//! Reconciliation Controller
//!
//! Orchestrates one batch run: partitions pending orders, runs one
//! submission session per chunk in parallel, merges handled sets strictly
//! after all sessions join, and retries the missing subset until the batch
//! converges or the attempt budget runs out. Retry lives here as loop state,
//! never as recursion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use shared::{Order, RunReport, UnresolvedOrder};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::batch::partition;
use crate::catalog::{CatalogLookup, CatalogResolver};
use crate::core::Config;
use crate::pricing::{normalize_order, NormalizedOrder};
use crate::session::{ChunkResult, FormFactory, SubmissionSession};

/// Outcome of the submission phase, before codes are mapped back onto the
/// ingested orders.
#[derive(Debug)]
pub struct SubmissionRun {
    pub attempts: u32,
    pub handled: Vec<String>,
    pub unresolved: Vec<(NormalizedOrder, String)>,
}

pub struct ReconciliationController {
    config: Arc<Config>,
    catalog: Arc<dyn CatalogLookup>,
    factory: Arc<dyn FormFactory>,
    cancel: CancellationToken,
}

impl ReconciliationController {
    pub fn new(
        config: Arc<Config>,
        catalog: Arc<dyn CatalogLookup>,
        factory: Arc<dyn FormFactory>,
    ) -> Self {
        Self {
            config,
            catalog,
            factory,
            cancel: CancellationToken::new(),
        }
    }

    /// Token for requesting shutdown. Cancellation is honored between
    /// attempts; a running attempt always finishes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Full pipeline for a batch of ingested orders: resolve, normalize,
    /// submit with retries, and report. Orders the catalog cannot resolve
    /// are unresolved immediately and never reach a session.
    pub async fn run_batch(&self, orders: Vec<Order>) -> RunReport {
        let resolver = CatalogResolver::new(Arc::clone(&self.catalog));
        let mut originals: HashMap<String, Order> = HashMap::new();
        let mut normalized = Vec::new();
        let mut unresolved = Vec::new();

        for mut order in orders {
            let prepared = match resolver.resolve_order(&mut order).await {
                Ok(()) => normalize_order(&mut order, &self.config.discount_item_sku),
                Err(err) => Err(err),
            };
            match prepared {
                Ok(ready) => {
                    originals.insert(order.code.clone(), order);
                    normalized.push(ready);
                }
                Err(err) => {
                    warn!(order = %order.code, error = %err, "order excluded before submission");
                    unresolved.push(UnresolvedOrder {
                        order,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let run = self.run(normalized).await;
        for (missing, reason) in run.unresolved {
            if let Some(original) = originals.remove(&missing.code) {
                unresolved.push(UnresolvedOrder {
                    order: original,
                    reason,
                });
            }
        }

        RunReport {
            attempts: run.attempts,
            handled: run.handled,
            unresolved,
        }
    }

    /// Submit normalized orders until every one is handled or the attempt
    /// budget is spent. Each attempt re-partitions only the missing subset
    /// and reuses no partial progress.
    pub async fn run(&self, orders: Vec<NormalizedOrder>) -> SubmissionRun {
        let run_id = Uuid::new_v4();
        let mut handled = Vec::new();
        let mut reasons: HashMap<String, String> = HashMap::new();
        let mut pending = orders;
        let mut attempt = 0;

        while !pending.is_empty() && attempt < self.config.max_attempts {
            if self.cancel.is_cancelled() {
                warn!(run = %run_id, "cancellation requested, stopping before next attempt");
                break;
            }
            attempt += 1;
            info!(
                run = %run_id,
                attempt,
                pending = pending.len(),
                "starting submission attempt"
            );

            let chunks = partition(pending.clone(), self.config.chunk_count);
            let mut sessions = JoinSet::new();
            for chunk in chunks {
                let config = Arc::clone(&self.config);
                let factory = Arc::clone(&self.factory);
                sessions.spawn(async move {
                    match factory.create().await {
                        Ok(form) => SubmissionSession::new(config, form).process(chunk).await,
                        Err(err) => ChunkResult::all_failed(&chunk, &err.to_string()),
                    }
                });
            }

            // Join every session before touching the aggregates; no merge
            // happens while any session still runs.
            let mut results = Vec::new();
            while let Some(joined) = sessions.join_next().await {
                match joined {
                    Ok(result) => results.push(result),
                    Err(err) => error!(run = %run_id, error = %err, "session task panicked"),
                }
            }

            let mut attempt_handled = HashSet::new();
            for result in &results {
                for code in result.handled_codes() {
                    attempt_handled.insert(code.to_string());
                    handled.push(code.to_string());
                }
                for (code, reason) in result.failures() {
                    reasons.insert(code.to_string(), reason.to_string());
                }
            }
            pending.retain(|order| !attempt_handled.contains(&order.code));

            info!(
                run = %run_id,
                attempt,
                handled = handled.len(),
                missing = pending.len(),
                "attempt finished"
            );
        }

        let unresolved = pending
            .into_iter()
            .map(|order| {
                let reason = reasons
                    .get(&order.code)
                    .cloned()
                    .unwrap_or_else(|| "not handled within attempt budget".into());
                (order, reason)
            })
            .collect();

        SubmissionRun {
            attempts: attempt,
            handled,
            unresolved,
        }
    }
}
