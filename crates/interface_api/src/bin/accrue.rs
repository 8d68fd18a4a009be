//! Stall Arrears Core - Accrual Job Binary
//!
//! Runs one penalty accrual pass and exits. Meant to be scheduled once a
//! day (cron, a Kubernetes CronJob, ...). Re-running on the same day is
//! harmless: each due is penalized at most once.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin arrears-accrue                 # as of today in ARREARS_TIMEZONE
//! cargo run --bin arrears-accrue -- 2024-03-15   # as of a given date
//! ```
//!
//! Exits non-zero if any due failed to accrue.

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use core_kernel::RequestContext;
use domain_arrears::{AccrualOutcome, ArrearsEngine};
use infra_db::{connect_ledger, DatabaseConfig, PostgresLedgerAdapter};
use interface_api::{config::{load_arrears_config, ApiConfig}, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading API_* configuration")?;
    init_tracing(&config.log_level, config.json_logs());
    let arrears = load_arrears_config().context("loading ARREARS_* configuration")?;

    let as_of = match std::env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, "%Y-%m-%d")
            .with_context(|| format!("invalid as-of date {:?}, expected YYYY-MM-DD", arg))?,
        None => arrears.timezone.today(),
    };

    let pool = connect_ledger(&DatabaseConfig::for_accrual_job(config.database_url.clone())).await?;

    let engine = ArrearsEngine::new(Arc::new(PostgresLedgerAdapter::new(pool)), &arrears);
    let ctx = RequestContext::system("arrears-accrue");

    let report = engine.accrual.accrue_penalties(&ctx, as_of).await?;
    for outcome in &report.outcomes {
        if let AccrualOutcome::Failed { lease_id, due_id, error } = outcome {
            tracing::error!(%lease_id, %due_id, %error, "Accrual failed for due");
        }
    }

    tracing::info!(
        as_of = %as_of,
        applied = report.applied_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        total_penalties = %report.total_penalties(),
        leases = report.affected_leases().len(),
        "Accrual job finished"
    );

    if report.failed_count() > 0 {
        bail!("{} due(s) failed to accrue", report.failed_count());
    }
    Ok(())
}
