//! Background execution of bulk jobs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use curator_model::{
    ItemId, ItemMetadata, JobId, JobStatus, MetadataPatch, OperationLog,
};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::database::{ItemRepository, ItemUpdate, JobRepository, JobUpdate};
use crate::diff::compute_diff;
use crate::error::Result;
use crate::jellyfin::MetadataSink;
use crate::metadata::apply_patch;

pub const DEFAULT_JOB_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(250);
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;

/// Rough per-item cost used for duration estimates.
const ESTIMATED_ITEM_COST: Duration = Duration::from_millis(100);

pub const UPDATE_METADATA_OPERATION: &str = "updateMetadata";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub max_concurrent_jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_JOB_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
        }
    }
}

/// Work handed to the runner once a job row exists.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPlan {
    pub job_id: JobId,
    pub item_ids: Vec<ItemId>,
    pub patch: MetadataPatch,
}

struct JobWorker {
    items: Arc<dyn ItemRepository>,
    jobs: Arc<dyn JobRepository>,
    sink: Arc<dyn MetadataSink>,
    config: RunnerConfig,
}

/// Spawns jobs on a tracked task set. At most `max_concurrent_jobs` run at
/// once; the rest wait in `pending`. Cancelling the shutdown token stops
/// running jobs between items and marks them `cancelled`.
pub struct JobRunner {
    worker: Arc<JobWorker>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRunner")
            .field("config", &self.worker.config)
            .field("active_tasks", &self.tracker.len())
            .field("available_permits", &self.permits.available_permits())
            .field("shutdown_cancelled", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl JobRunner {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        jobs: Arc<dyn JobRepository>,
        sink: Arc<dyn MetadataSink>,
        config: RunnerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let config = RunnerConfig {
            batch_size: config.batch_size.max(1),
            max_concurrent_jobs: config.max_concurrent_jobs.max(1),
            ..config
        };
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            worker: Arc::new(JobWorker {
                items,
                jobs,
                sink,
                config,
            }),
            tracker: TaskTracker::new(),
            shutdown,
        }
    }

    pub fn config(&self) -> RunnerConfig {
        self.worker.config
    }

    pub fn submit(&self, plan: JobPlan) {
        let worker = Arc::clone(&self.worker);
        let permits = Arc::clone(&self.permits);
        let shutdown = self.shutdown.clone();

        self.tracker.spawn(async move {
            let job_id = plan.job_id;
            let permit = tokio::select! {
                permit = permits.acquire_owned() => permit.ok(),
                _ = shutdown.cancelled() => None,
            };
            let Some(_permit) = permit else {
                worker.finish_cancelled(job_id).await;
                return;
            };

            if let Err(err) = worker.run(&plan, &shutdown).await {
                error!(target: "curator::jobs", %job_id, error = %err, "bulk job failed");
                let update = JobUpdate {
                    status: Some(JobStatus::Failed),
                    end_time: Some(Utc::now()),
                    error_message: Some(err.to_string()),
                    ..JobUpdate::default()
                };
                if let Err(store_err) = worker.jobs.update_job(job_id, update).await {
                    error!(
                        target: "curator::jobs",
                        %job_id,
                        error = %store_err,
                        "could not record job failure"
                    );
                }
            }
        });
    }

    /// Rough wall-clock estimate for `items` items, in whole seconds.
    pub fn estimate_duration(&self, items: usize) -> u64 {
        let config = self.worker.config;
        let batches = items.div_ceil(config.batch_size);
        let delays = config.batch_delay * u32::try_from(batches.saturating_sub(1)).unwrap_or(u32::MAX);
        let work = ESTIMATED_ITEM_COST * u32::try_from(items).unwrap_or(u32::MAX);
        (delays + work).as_secs_f64().ceil() as u64
    }

    /// Wait until every submitted job has reached a terminal state.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel in-flight jobs and wait for them to record their final state.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!(target: "curator::jobs", "job runner stopped");
    }
}

impl JobWorker {
    async fn run(&self, plan: &JobPlan, shutdown: &CancellationToken) -> Result<()> {
        let job_id = plan.job_id;
        let total = plan.item_ids.len();
        self.jobs
            .update_job(
                job_id,
                JobUpdate {
                    status: Some(JobStatus::Running),
                    start_time: Some(Utc::now()),
                    ..JobUpdate::default()
                },
            )
            .await?;
        info!(target: "curator::jobs", %job_id, items = total, "bulk job started");

        let mut processed: u32 = 0;
        let mut failed: u32 = 0;

        for (batch_index, batch) in plan.item_ids.chunks(self.config.batch_size).enumerate() {
            if batch_index > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.batch_delay) => {}
                    _ = shutdown.cancelled() => {}
                }
            }

            for item_id in batch {
                if shutdown.is_cancelled() {
                    info!(
                        target: "curator::jobs",
                        %job_id,
                        processed,
                        failed,
                        "bulk job cancelled by shutdown"
                    );
                    self.jobs
                        .update_job(
                            job_id,
                            JobUpdate {
                                status: Some(JobStatus::Cancelled),
                                end_time: Some(Utc::now()),
                                ..JobUpdate::default()
                            },
                        )
                        .await?;
                    return Ok(());
                }

                let entry = self.apply_item(job_id, *item_id, &plan.patch).await;
                if entry.success {
                    processed += 1;
                } else {
                    failed += 1;
                }
                self.jobs.append_log(entry).await?;

                let done = f64::from(processed + failed);
                self.jobs
                    .update_job(
                        job_id,
                        JobUpdate {
                            progress: Some(done / total as f64),
                            items_processed: Some(processed),
                            items_failed: Some(failed),
                            ..JobUpdate::default()
                        },
                    )
                    .await?;
            }
        }

        self.jobs
            .update_job(
                job_id,
                JobUpdate {
                    status: Some(JobStatus::Completed),
                    progress: Some(1.0),
                    end_time: Some(Utc::now()),
                    ..JobUpdate::default()
                },
            )
            .await?;
        info!(target: "curator::jobs", %job_id, processed, failed, "bulk job completed");
        Ok(())
    }

    /// Apply the patch to one item. Never fails: problems become a failed
    /// log entry.
    async fn apply_item(&self, job_id: JobId, item_id: ItemId, patch: &MetadataPatch) -> OperationLog {
        let failed = |before: Option<serde_json::Value>, message: String| {
            warn!(target: "curator::jobs", %job_id, %item_id, error = %message, "item update failed");
            OperationLog::failed(job_id, item_id, UPDATE_METADATA_OPERATION, before, message)
        };

        let item = match self.items.get(item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => return failed(None, format!("item {item_id} not found")),
            Err(err) => return failed(None, err.to_string()),
        };

        let current = ItemMetadata::from_item(&item);
        let before = match serde_json::to_value(&current) {
            Ok(value) => value,
            Err(err) => return failed(None, err.to_string()),
        };

        let proposed = apply_patch(&current, patch);
        let diff = compute_diff(&current, &proposed, item_id);
        if !diff.has_changes {
            debug!(target: "curator::jobs", %job_id, %item_id, "item already up to date");
            return OperationLog::succeeded(
                job_id,
                item_id,
                UPDATE_METADATA_OPERATION,
                before.clone(),
                before,
            );
        }

        let updated = match self
            .items
            .update(item_id, ItemUpdate::from_diff(proposed.clone(), &diff))
            .await
        {
            Ok(updated) => updated,
            Err(err) => return failed(Some(before), err.to_string()),
        };

        if self.sink.is_enabled()
            && let Err(err) = self.sink.write_metadata(&item.jellyfin_id, &proposed).await
        {
            warn!(
                target: "curator::jobs",
                %job_id,
                %item_id,
                jellyfin_id = %item.jellyfin_id,
                error = %err,
                "jellyfin write failed; local update kept"
            );
        }

        let after = serde_json::to_value(ItemMetadata::from_item(&updated))
            .unwrap_or_else(|_| serde_json::Value::Null);
        debug!(target: "curator::jobs", %job_id, %item_id, "item updated");
        OperationLog::succeeded(job_id, item_id, UPDATE_METADATA_OPERATION, before, after)
    }

    async fn finish_cancelled(&self, job_id: JobId) {
        let update = JobUpdate {
            status: Some(JobStatus::Cancelled),
            end_time: Some(Utc::now()),
            ..JobUpdate::default()
        };
        if let Err(err) = self.jobs.update_job(job_id, update).await {
            error!(target: "curator::jobs", %job_id, error = %err, "could not mark job cancelled");
        }
    }
}
