//! PostgreSQL implementation of the job and task stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use graphsplit_core::{
    Job, JobNotifier, JobProgress, JobSummary, NewTask, Status, Task, TaskOutcome, TransitionError,
};
use graphsplit_graph::parse_dimensions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{failed_tasks_message, JobStore, TaskStore, Transactional};

// ── Rows ─────────────────────────────────────────────────────────────

const JOB_COLUMNS: &str = "id, filename, content, dimensions, status, error, result_ref, created_at";
const SUMMARY_COLUMNS: &str = "id, filename, dimensions, status, error, result_ref, created_at";
const TASK_COLUMNS: &str =
    "id, job_id, node_count, edges, mapping, status, error, result_ref, created_at, updated_at";

fn parse_status(raw: &str) -> Result<Status, StoreError> {
    raw.parse().map_err(|e| StoreError::Corrupt(format!("{e}")))
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    filename: String,
    content: String,
    dimensions: String,
    status: String,
    error: Option<String>,
    result_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(r: JobRow) -> Result<Self, StoreError> {
        Ok(Job {
            id: r.id,
            filename: r.filename,
            content: r.content,
            dimensions: r.dimensions,
            status: parse_status(&r.status)?,
            error: r.error,
            result_ref: r.result_ref,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct JobSummaryRow {
    id: Uuid,
    filename: String,
    dimensions: String,
    status: String,
    error: Option<String>,
    result_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobSummaryRow> for JobSummary {
    type Error = StoreError;

    fn try_from(r: JobSummaryRow) -> Result<Self, StoreError> {
        Ok(JobSummary {
            id: r.id,
            filename: r.filename,
            dimensions: r.dimensions,
            status: parse_status(&r.status)?,
            error: r.error,
            result_ref: r.result_ref,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    job_id: Uuid,
    node_count: i32,
    edges: Vec<i32>,
    mapping: Vec<i32>,
    status: String,
    error: Option<String>,
    result_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(r: TaskRow) -> Result<Self, StoreError> {
        Ok(Task {
            id: r.id,
            job_id: r.job_id,
            node_count: r.node_count,
            edges: r.edges,
            mapping: r.mapping,
            status: parse_status(&r.status)?,
            error: r.error,
            result_ref: r.result_ref,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Statuses a row must currently hold for a move to `next` to apply.
fn predecessors(next: Status) -> Vec<String> {
    Status::predecessors(next)
        .into_iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

// ── Guard failures ───────────────────────────────────────────────────

/// Explain a guarded UPDATE that touched no row: missing vs. wrong status.
async fn job_miss(conn: &mut PgConnection, id: Uuid, to: Status) -> StoreError {
    let current: Result<Option<String>, sqlx::Error> =
        sqlx::query_scalar("SELECT status FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await;
    match current {
        Ok(None) => StoreError::JobNotFound(id),
        Ok(Some(raw)) => match parse_status(&raw) {
            Ok(from) => TransitionError { from, to }.into(),
            Err(e) => e,
        },
        Err(e) => e.into(),
    }
}

async fn task_miss(conn: &mut PgConnection, id: Uuid, to: Status) -> StoreError {
    let current: Result<Option<String>, sqlx::Error> =
        sqlx::query_scalar("SELECT status FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await;
    match current {
        Ok(None) => StoreError::TaskNotFound(id),
        Ok(Some(raw)) => match parse_status(&raw) {
            Ok(from) => TransitionError { from, to }.into(),
            Err(e) => e,
        },
        Err(e) => e.into(),
    }
}

async fn progress_of(conn: &mut PgConnection, job_id: Uuid) -> Result<JobProgress, StoreError> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, count(*) FROM tasks WHERE job_id = $1 GROUP BY status")
            .bind(job_id)
            .fetch_all(conn)
            .await?;
    let mut progress = JobProgress::default();
    for (raw, n) in rows {
        progress.total += n;
        match parse_status(&raw)? {
            Status::Created => progress.created += n,
            Status::Executing => progress.executing += n,
            Status::Completed => progress.completed += n,
            Status::Failed => progress.failed += n,
        }
    }
    Ok(progress)
}

// ── Store ────────────────────────────────────────────────────────────

/// Postgres-backed store. Cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    notifier: Option<JobNotifier>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, notifier: None }
    }

    /// Signal `notifier` after every saved job.
    pub fn with_notifier(mut self, notifier: JobNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

#[async_trait]
impl Transactional for PgStore {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        Ok(tx.commit().await?)
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        Ok(tx.rollback().await?)
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn save_job(&self, filename: &str, content: &str) -> Result<Uuid, StoreError> {
        let dimensions = parse_dimensions(content);
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO jobs (filename, content, dimensions) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(filename)
        .bind(content)
        .bind(&dimensions)
        .fetch_one(&self.pool)
        .await?;

        info!(job_id = %id, filename, dimensions = %dimensions, "job saved");
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
        Ok(id)
    }

    async fn get_job(&self, id: Uuid) -> Result<Job, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::JobNotFound(id))?;
        row.try_into()
    }

    async fn get_job_summary(&self, id: Uuid) -> Result<JobSummary, StoreError> {
        let row = sqlx::query_as::<_, JobSummaryRow>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::JobNotFound(id))?;
        row.try_into()
    }

    async fn list_jobs(&self, status: Option<Status>) -> Result<Vec<JobSummary>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, JobSummaryRow>(&format!(
                    "SELECT {SUMMARY_COLUMNS} FROM jobs WHERE status = $1 ORDER BY created_at DESC"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, JobSummaryRow>(&format!(
                    "SELECT {SUMMARY_COLUMNS} FROM jobs ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(JobSummary::try_from).collect()
    }

    async fn next_pending_job(&self) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs
             WHERE status = 'created' AND error IS NULL
             ORDER BY created_at ASC
             LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Job::try_from).transpose()
    }

    async fn record_job_error(&self, id: Uuid, message: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE jobs SET error = $1 WHERE id = $2")
            .bind(message)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(id));
        }
        Ok(())
    }

    async fn set_job_status(&self, tx: &mut Self::Tx, id: Uuid, status: Status) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE jobs SET status = $1 WHERE id = $2 AND status = ANY($3)")
            .bind(status.as_str())
            .bind(id)
            .bind(predecessors(status))
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(job_miss(&mut **tx, id, status).await);
        }
        Ok(())
    }

    async fn finish_job_if_done(&self, tx: &mut Self::Tx, id: Uuid) -> Result<Option<Status>, StoreError> {
        let progress = progress_of(&mut **tx, id).await?;
        let Some(status) = progress.final_status() else {
            return Ok(None);
        };
        let result = sqlx::query(
            "UPDATE jobs SET status = $1, error = COALESCE($2, error)
             WHERE id = $3 AND status = 'executing'",
        )
        .bind(status.as_str())
        .bind(failed_tasks_message(&progress))
        .bind(id)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            debug!(job_id = %id, "job not executing, leaving status as is");
            return Ok(None);
        }
        Ok(Some(status))
    }

    async fn job_progress(&self, id: Uuid) -> Result<JobProgress, StoreError> {
        let mut conn = self.pool.acquire().await?;
        progress_of(&mut conn, id).await
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, tx: &mut Self::Tx, job_id: Uuid, task: &NewTask) -> Result<Uuid, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO tasks (job_id, node_count, edges, mapping, status)
             VALUES ($1, $2, $3, $4, 'created')
             RETURNING id",
        )
        .bind(job_id)
        .bind(task.node_count)
        .bind(&task.edges)
        .bind(&task.mapping)
        .fetch_one(&mut **tx)
        .await?;
        Ok(id)
    }

    async fn get_task_by_status(&self, status: Status) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE status = $1 ORDER BY RANDOM() LIMIT 1"
        ))
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Task::try_from).transpose()
    }

    async fn update_task_status(&self, id: Uuid, status: Status) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE tasks SET status = $1, updated_at = now() WHERE id = $2 AND status = ANY($3)",
        )
        .bind(status.as_str())
        .bind(id)
        .bind(predecessors(status))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            let mut conn = self.pool.acquire().await?;
            return Err(task_miss(&mut conn, id, status).await);
        }
        Ok(())
    }

    async fn complete_task_in_tx(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        outcome: &TaskOutcome,
    ) -> Result<(), StoreError> {
        let status = outcome.status;
        let result = match &outcome.error {
            Some(error) => {
                sqlx::query(
                    "UPDATE tasks SET status = $1, error = $2, updated_at = now()
                     WHERE id = $3 AND status = ANY($4)",
                )
                .bind(status.as_str())
                .bind(error)
                .bind(id)
                .bind(predecessors(status))
                .execute(&mut **tx)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE tasks SET status = $1, updated_at = now()
                     WHERE id = $2 AND status = ANY($3)",
                )
                .bind(status.as_str())
                .bind(id)
                .bind(predecessors(status))
                .execute(&mut **tx)
                .await?
            }
        };
        if result.rows_affected() == 0 {
            return Err(task_miss(&mut **tx, id, status).await);
        }

        let Some(result_ref) = &outcome.result_ref else {
            return Ok(());
        };
        let result = sqlx::query("UPDATE tasks SET result_ref = $1 WHERE id = $2")
            .bind(result_ref)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::TaskNotFound(id));
        }
        Ok(())
    }

    async fn list_tasks(&self, job_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE job_id = $1 ORDER BY created_at, id"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Task::try_from).collect()
    }
}
