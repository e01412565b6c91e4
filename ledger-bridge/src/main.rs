use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use ledger_bridge::catalog::FileCatalog;
use ledger_bridge::controller::ReconciliationController;
use ledger_bridge::core::Config;
use ledger_bridge::session::DryRunFormFactory;
use ledger_bridge::source::{JsonFileSource, OrderSource};
use ledger_bridge::utils::logger::init_logger_with_file;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    init_logger_with_file(
        std::env::var("LOG_LEVEL").ok().as_deref(),
        config.log_dir.as_deref(),
    );
    info!(
        chunk_count = config.chunk_count,
        max_attempts = config.max_attempts,
        "starting batch run"
    );

    let catalog_path =
        std::env::var("CATALOG_FILE").context("CATALOG_FILE must point at the catalog export")?;
    let orders_path =
        std::env::var("ORDERS_FILE").context("ORDERS_FILE must point at the orders export")?;

    let catalog = Arc::new(FileCatalog::load(&catalog_path)?);
    info!(entries = catalog.len(), "catalog loaded");
    let source = JsonFileSource::new(&orders_path);

    // Either an explicit code list or an inclusive date range selects the
    // batch.
    let orders = match std::env::var("ORDER_CODES") {
        Ok(raw) => {
            let codes: Vec<String> = raw
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            source.fetch_by_codes(&codes).await?
        }
        Err(_) => {
            let from = parse_date("FROM_DATE")?;
            let to = parse_date("TO_DATE")?;
            source.fetch_by_date_range(from, to).await?
        }
    };
    info!(count = orders.len(), "orders ingested");

    let controller = ReconciliationController::new(
        Arc::new(config),
        catalog,
        Arc::new(DryRunFormFactory),
    );
    let report = controller.run_batch(orders).await;

    info!(
        attempts = report.attempts,
        handled = report.handled.len(),
        unresolved = report.unresolved.len(),
        "batch finished"
    );
    for unresolved in &report.unresolved {
        warn!(
            order = %unresolved.order.code,
            reason = %unresolved.reason,
            "order unresolved"
        );
    }
    if !report.is_converged() {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_date(name: &str) -> Result<DateTime<Utc>> {
    let raw = std::env::var(name)
        .with_context(|| format!("{name} is required when ORDER_CODES is unset"))?;
    raw.parse()
        .with_context(|| format!("{name} must be an ISO-8601 UTC timestamp, got {raw:?}"))
}
