//! Background job scheduler.
//!
//! Runs the snapshot retention sweep on a fixed cron cadence. Cached
//! snapshots age out rather than being deleted on read, so a stale snapshot
//! is still usable for diffing until the sweep removes it.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use gramdelta_core::AppConfig;

// Daily at 03:15 UTC, off the usual top-of-hour spikes.
const RETENTION_SWEEP_CRON: &str = "0 15 3 * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised or
/// started.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let retention_days = config.snapshot_retention_days;
    let job = Job::new_async(RETENTION_SWEEP_CRON, move |_id, _scheduler| {
        let pool = pool.clone();
        Box::pin(async move {
            run_retention_sweep(&pool, retention_days).await;
        })
    })?;
    scheduler.add(job).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn run_retention_sweep(pool: &PgPool, retention_days: i64) {
    match gramdelta_db::delete_snapshots_older_than(pool, retention_days).await {
        Ok(deleted) => {
            tracing::info!(deleted, retention_days, "snapshot retention sweep finished");
        }
        Err(e) => {
            tracing::error!(error = %e, "snapshot retention sweep failed");
        }
    }
}
