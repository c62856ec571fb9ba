use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use curator_core::database::{JobFilter, LogOrder};
use curator_model::{
    ExecuteRequest, Job, JobId, JobStatus, JobStatusResponse, JobType,
    OperationPreviewResponse, OperationRequest,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::handlers::page_limit;
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

const DEFAULT_JOB_PAGE: u64 = 20;
/// Logs returned with `includeDetails`
const MAX_DETAIL_LOGS: u64 = 1000;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetailQuery {
    #[serde(default)]
    pub include_details: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub limit: u64,
    pub offset: u64,
}

pub async fn preview_handler(
    State(state): State<AppState>,
    Json(request): Json<OperationRequest>,
) -> AppResult<Json<OperationPreviewResponse>> {
    let preview = state.operations.generate_preview(request).await?;
    info!(
        target: "curator::jobs",
        items = preview.total_items,
        with_changes = preview.summary.items_with_changes,
        "bulk preview generated"
    );
    Ok(Json(preview))
}

pub async fn execute_handler(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> AppResult<impl IntoResponse> {
    let response = state.operations.execute(&request.preview_token).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub async fn get_job_handler(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Query(query): Query<JobDetailQuery>,
) -> AppResult<Json<JobStatusResponse>> {
    let job = state
        .stores
        .jobs
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("job {job_id}")))?;

    let operation_logs = if query.include_details {
        Some(
            state
                .stores
                .jobs
                .list_logs(job_id, MAX_DETAIL_LOGS, LogOrder::Oldest)
                .await?,
        )
    } else {
        None
    };

    Ok(Json(JobStatusResponse {
        job,
        operation_logs,
    }))
}

pub async fn list_jobs_handler(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> AppResult<Json<JobListResponse>> {
    let limit = page_limit(query.limit, DEFAULT_JOB_PAGE);
    let offset = query.offset.unwrap_or(0);
    let filter = JobFilter {
        job_type: query.job_type.as_deref().map(JobType::from_str).transpose()?,
        status: query.status.as_deref().map(JobStatus::from_str).transpose()?,
        limit,
        offset,
    };

    let jobs = state.stores.jobs.list_jobs(&filter).await?;
    Ok(Json(JobListResponse {
        jobs,
        limit,
        offset,
    }))
}
