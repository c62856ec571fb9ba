use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ModelError;
use crate::ids::{ItemId, JobId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(ModelError::UnknownVariant {
                kind: "job status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    BulkMetadataUpdate,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::BulkMetadataUpdate => "bulk_metadata_update",
        }
    }
}

impl Display for JobType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bulk_metadata_update" | "updateMetadata" => {
                Ok(JobType::BulkMetadataUpdate)
            }
            _ => Err(ModelError::UnknownVariant {
                kind: "job type",
                value: s.to_string(),
            }),
        }
    }
}

/// Durable record of one asynchronous bulk execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub progress: f64,
    pub items_total: u32,
    pub items_processed: u32,
    pub items_failed: u32,
    /// Durable copy of the executed operation and its resolved item ids
    pub spec: Value,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn pending(job_type: JobType, items_total: u32, spec: Value) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            job_type,
            status: JobStatus::Pending,
            progress: 0.0,
            items_total,
            items_processed: 0,
            items_failed: 0,
            spec,
            start_time: None,
            end_time: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `(processed + failed) / total`, with an empty job counting as done.
    pub fn compute_progress(&self) -> f64 {
        if self.items_total == 0 {
            return 1.0;
        }
        let done = f64::from(self.items_processed + self.items_failed);
        (done / f64::from(self.items_total)).clamp(0.0, 1.0)
    }
}

/// Append-only audit entry for one item processed within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLog {
    pub id: Uuid,
    pub job_id: JobId,
    pub item_id: ItemId,
    pub operation: String,
    pub before_snapshot: Option<Value>,
    pub after_snapshot: Option<Value>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OperationLog {
    pub fn succeeded(
        job_id: JobId,
        item_id: ItemId,
        operation: impl Into<String>,
        before: Value,
        after: Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            job_id,
            item_id,
            operation: operation.into(),
            before_snapshot: Some(before),
            after_snapshot: Some(after),
            success: true,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn failed(
        job_id: JobId,
        item_id: ItemId,
        operation: impl Into<String>,
        before: Option<Value>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            job_id,
            item_id,
            operation: operation.into(),
            before_snapshot: before,
            after_snapshot: None,
            success: false,
            error_message: Some(error.into()),
            created_at: Utc::now(),
        }
    }
}
