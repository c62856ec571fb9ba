use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use curator_model::{
    ExecuteResponse, ItemId, ItemMetadata, Job, JobStatus, JobType, OperationPreviewResponse,
    OperationRequest,
};
use serde::Serialize;
use tracing::{debug, info};

use super::preview::PreviewTokenStore;
use super::runner::{JobPlan, JobRunner};
use super::scope::resolve_scope;
use crate::database::{ItemRepository, JobRepository};
use crate::diff::{DiffInput, compute_bulk_diff, diff_summary};
use crate::error::{CuratorError, Result};
use crate::metadata::{apply_patch, validate_patch};

pub const DEFAULT_MAX_SCOPE_ITEMS: usize = 10_000;

/// Durable copy of the operation stored on the job row.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobSpec<'a> {
    request: &'a OperationRequest,
    item_ids: &'a [ItemId],
    previewed_at: DateTime<Utc>,
}

/// Preview/execute front door for bulk metadata operations.
pub struct BulkOperationService {
    items: Arc<dyn ItemRepository>,
    jobs: Arc<dyn JobRepository>,
    tokens: Arc<PreviewTokenStore>,
    runner: Arc<JobRunner>,
    max_scope_items: usize,
}

impl fmt::Debug for BulkOperationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkOperationService")
            .field("tokens", &self.tokens)
            .field("runner", &self.runner)
            .field("max_scope_items", &self.max_scope_items)
            .finish_non_exhaustive()
    }
}

impl BulkOperationService {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        jobs: Arc<dyn JobRepository>,
        tokens: Arc<PreviewTokenStore>,
        runner: Arc<JobRunner>,
    ) -> Self {
        Self {
            items,
            jobs,
            tokens,
            runner,
            max_scope_items: DEFAULT_MAX_SCOPE_ITEMS,
        }
    }

    pub fn with_max_scope_items(mut self, max_scope_items: usize) -> Self {
        self.max_scope_items = max_scope_items.max(1);
        self
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }

    pub fn tokens(&self) -> &Arc<PreviewTokenStore> {
        &self.tokens
    }

    /// Resolve, diff and mint a token. Reads only; nothing is written to the
    /// item or job stores.
    pub async fn generate_preview(
        &self,
        request: OperationRequest,
    ) -> Result<OperationPreviewResponse> {
        validate_patch(&request.changes)?;

        let swept = self.tokens.sweep_expired();
        if swept > 0 {
            debug!(target: "curator::jobs", swept, "dropped expired preview tokens");
        }

        let scope =
            resolve_scope(self.items.as_ref(), &request.scope, self.max_scope_items).await?;
        let items = self.items.get_many(&scope.item_ids).await?;

        let inputs: Vec<DiffInput> = items
            .iter()
            .map(|item| {
                let current = ItemMetadata::from_item(item);
                let proposed = apply_patch(&current, &request.changes);
                DiffInput {
                    item_id: item.id,
                    current,
                    proposed,
                }
            })
            .collect();
        let changes = compute_bulk_diff(&inputs);
        let summary = diff_summary(&changes);

        let (preview_token, expires_at) = self.tokens.issue(request, scope.item_ids)?;

        Ok(OperationPreviewResponse {
            preview_token,
            total_items: changes.len(),
            estimated_api_calls: summary.items_with_changes,
            changes,
            summary,
            missing_item_ids: scope.missing_item_ids,
            expires_at,
        })
    }

    /// Consume the token, record a durable job and hand it to the runner.
    pub async fn execute(&self, preview_token: &str) -> Result<ExecuteResponse> {
        if preview_token.trim().is_empty() {
            return Err(CuratorError::validation("previewToken is required"));
        }
        let record = self.tokens.consume(preview_token)?;

        let items_total = u32::try_from(record.item_ids.len())
            .map_err(|_| CuratorError::validation("scope is too large"))?;
        let spec = serde_json::to_value(JobSpec {
            request: &record.request,
            item_ids: &record.item_ids,
            previewed_at: record.created_at,
        })?;
        let job = self
            .jobs
            .create_job(Job::pending(JobType::BulkMetadataUpdate, items_total, spec))
            .await?;

        info!(
            target: "curator::jobs",
            job_id = %job.id,
            items = items_total,
            "bulk job queued"
        );

        let estimated_duration = self.runner.estimate_duration(record.item_ids.len());
        self.runner.submit(JobPlan {
            job_id: job.id,
            item_ids: record.item_ids,
            patch: record.request.changes,
        });

        Ok(ExecuteResponse {
            job_id: job.id,
            status: JobStatus::Pending,
            estimated_duration,
        })
    }
}
