//! Background job scheduler.
//!
//! Registers the recurring favourites sync on a [`JobScheduler`] at server
//! startup.

use std::sync::Arc;
use std::time::Duration;

use favsync_sync::SyncPipeline;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tokio_util::sync::CancellationToken;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pipeline: Arc<SyncPipeline>,
    schedule: &str,
    deadline: Duration,
    shutdown: CancellationToken,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_sync_job(&scheduler, schedule, pipeline, deadline, shutdown).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring favourites sync. A failed run is logged and the
/// next tick tries again; runs are never retried in between.
async fn register_sync_job(
    scheduler: &JobScheduler,
    schedule: &str,
    pipeline: Arc<SyncPipeline>,
    deadline: Duration,
    shutdown: CancellationToken,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let pipeline = Arc::clone(&pipeline);
        let shutdown = shutdown.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting favourites sync");
            match pipeline.run_with_deadline(&shutdown, deadline).await {
                Ok(report) => {
                    tracing::info!(count = report.count, "scheduler: favourites sync complete");
                }
                Err(e) => {
                    tracing::error!(error = %e, stage = %e.stage(), "scheduler: favourites sync failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(schedule, "scheduler: registered favourites sync");
    Ok(())
}
