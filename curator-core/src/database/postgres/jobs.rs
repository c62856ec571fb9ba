use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curator_model::{ItemId, Job, JobId, JobStatus, JobType, OperationLog};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::ports::{JobFilter, JobRepository, JobUpdate, LogOrder};
use crate::error::{CuratorError, Result};

const JOB_COLUMNS: &str = r#"
    id, job_type, status, progress, items_total, items_processed, items_failed, spec,
    start_time, end_time, error_message, created_at, updated_at
"#;

const LOG_COLUMNS: &str = r#"
    id, job_id, item_id, operation, before_snapshot, after_snapshot, success,
    error_message, created_at
"#;

#[derive(Debug, Clone)]
pub struct PostgresJobRepository {
    pool: PgPool,
}

impl PostgresJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn from_db_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

#[async_trait]
impl JobRepository for PostgresJobRepository {
    async fn create_job(&self, job: Job) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            INSERT INTO bulk_jobs (
                id, job_type, status, progress, items_total, items_processed, items_failed,
                spec, start_time, end_time, error_message, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.id.to_uuid())
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(job.progress)
        .bind(to_db_count(job.items_total))
        .bind(to_db_count(job.items_processed))
        .bind(to_db_count(job.items_failed))
        .bind(&job.spec)
        .bind(job.start_time)
        .bind(job.end_time)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Job::try_from(row)
    }

    async fn update_job(&self, id: JobId, update: JobUpdate) -> Result<Job> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE bulk_jobs SET updated_at = NOW()");
        if let Some(status) = update.status {
            builder.push(", status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(progress) = update.progress {
            builder.push(", progress = ");
            builder.push_bind(progress.clamp(0.0, 1.0));
        }
        if let Some(processed) = update.items_processed {
            builder.push(", items_processed = ");
            builder.push_bind(to_db_count(processed));
        }
        if let Some(failed) = update.items_failed {
            builder.push(", items_failed = ");
            builder.push_bind(to_db_count(failed));
        }
        if let Some(start) = update.start_time {
            builder.push(", start_time = ");
            builder.push_bind(start);
        }
        if let Some(end) = update.end_time {
            builder.push(", end_time = ");
            builder.push_bind(end);
        }
        if let Some(message) = update.error_message {
            builder.push(", error_message = ");
            builder.push_bind(message);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id.to_uuid());
        builder.push(format!(" RETURNING {JOB_COLUMNS}"));

        let row = builder
            .build_query_as::<JobRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CuratorError::not_found(format!("job {id}")))?;
        Job::try_from(row)
    }

    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM bulk_jobs WHERE id = $1"
        ))
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Job::try_from).transpose()
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {JOB_COLUMNS} FROM bulk_jobs WHERE 1=1"));
        if let Some(job_type) = filter.job_type {
            builder.push(" AND job_type = ");
            builder.push_bind(job_type.as_str());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(i64::try_from(filter.limit).unwrap_or(i64::MAX));
        builder.push(" OFFSET ");
        builder.push_bind(i64::try_from(filter.offset).unwrap_or(i64::MAX));

        let rows = builder
            .build_query_as::<JobRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn append_log(&self, entry: OperationLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO operation_logs (
                id, job_id, item_id, operation, before_snapshot, after_snapshot, success,
                error_message, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.job_id.to_uuid())
        .bind(entry.item_id.to_uuid())
        .bind(&entry.operation)
        .bind(&entry.before_snapshot)
        .bind(&entry.after_snapshot)
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_logs(
        &self,
        job_id: JobId,
        limit: u64,
        order: LogOrder,
    ) -> Result<Vec<OperationLog>> {
        let direction = match order {
            LogOrder::Oldest => "ASC",
            LogOrder::Newest => "DESC",
        };
        let rows = sqlx::query_as::<_, LogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM operation_logs WHERE job_id = $1 \
             ORDER BY seq {direction} LIMIT $2"
        ))
        .bind(job_id.to_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OperationLog::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    job_type: String,
    status: String,
    progress: f64,
    items_total: i32,
    items_processed: i32,
    items_failed: i32,
    spec: serde_json::Value,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = CuratorError;

    fn try_from(row: JobRow) -> Result<Self> {
        let job_type: JobType = row
            .job_type
            .parse()
            .map_err(|e| CuratorError::Internal(format!("Invalid job_type for {}: {e}", row.id)))?;
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|e| CuratorError::Internal(format!("Invalid status for {}: {e}", row.id)))?;

        Ok(Job {
            id: JobId(row.id),
            job_type,
            status,
            progress: row.progress,
            items_total: from_db_count(row.items_total),
            items_processed: from_db_count(row.items_processed),
            items_failed: from_db_count(row.items_failed),
            spec: row.spec,
            start_time: row.start_time,
            end_time: row.end_time,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: Uuid,
    job_id: Uuid,
    item_id: Uuid,
    operation: String,
    before_snapshot: Option<serde_json::Value>,
    after_snapshot: Option<serde_json::Value>,
    success: bool,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<LogRow> for OperationLog {
    fn from(row: LogRow) -> Self {
        OperationLog {
            id: row.id,
            job_id: JobId(row.job_id),
            item_id: ItemId(row.item_id),
            operation: row.operation,
            before_snapshot: row.before_snapshot,
            after_snapshot: row.after_snapshot,
            success: row.success,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}
