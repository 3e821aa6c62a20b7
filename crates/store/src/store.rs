//! Persistence contracts for jobs and tasks.
//!
//! Multi-row mutations share an ambient transaction: the caller opens it with
//! [`Transactional::begin`], passes it to each `*_in_tx`-style operation and
//! then commits or rolls back. Every status change is checked against the
//! transition table in [`graphsplit_core::status`].

use async_trait::async_trait;
use graphsplit_core::{Job, JobProgress, JobSummary, NewTask, Status, Task, TaskOutcome};
use uuid::Uuid;

use crate::error::StoreError;

#[async_trait]
pub trait Transactional: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;
    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;
}

#[async_trait]
pub trait JobStore: Transactional {
    /// Insert a job in `created` and wake the scheduler.
    async fn save_job(&self, filename: &str, content: &str) -> Result<Uuid, StoreError>;

    async fn get_job(&self, id: Uuid) -> Result<Job, StoreError>;

    async fn get_job_summary(&self, id: Uuid) -> Result<JobSummary, StoreError>;

    /// All jobs, or only those in `status`, newest first.
    async fn list_jobs(&self, status: Option<Status>) -> Result<Vec<JobSummary>, StoreError>;

    /// Oldest `created` job that has no recorded validation error.
    async fn next_pending_job(&self) -> Result<Option<Job>, StoreError>;

    /// Attach an error message without touching the status.
    async fn record_job_error(&self, id: Uuid, message: &str) -> Result<(), StoreError>;

    async fn set_job_status(&self, tx: &mut Self::Tx, id: Uuid, status: Status) -> Result<(), StoreError>;

    /// Flip a job from `created` to `executing`.
    async fn schedule_job(&self, tx: &mut Self::Tx, id: Uuid) -> Result<(), StoreError> {
        self.set_job_status(tx, id, Status::Executing).await
    }

    /// Move an `executing` job to its final status once no task is pending.
    ///
    /// Returns the status applied, or `None` when work remains.
    async fn finish_job_if_done(&self, tx: &mut Self::Tx, id: Uuid) -> Result<Option<Status>, StoreError>;

    async fn job_progress(&self, id: Uuid) -> Result<JobProgress, StoreError>;
}

#[async_trait]
pub trait TaskStore: Transactional {
    async fn create_task(&self, tx: &mut Self::Tx, job_id: Uuid, task: &NewTask) -> Result<Uuid, StoreError>;

    /// A random task in `status`, so concurrent pollers do not starve rows.
    async fn get_task_by_status(&self, status: Status) -> Result<Option<Task>, StoreError>;

    async fn update_task_status(&self, id: Uuid, status: Status) -> Result<(), StoreError>;

    /// Record a finished task: status (and error) first, then the result
    /// reference when one is present. Both writes must hit exactly one row.
    async fn complete_task_in_tx(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        outcome: &TaskOutcome,
    ) -> Result<(), StoreError>;

    async fn list_tasks(&self, job_id: Uuid) -> Result<Vec<Task>, StoreError>;
}

/// Everything the scheduler and the API need from one backend.
pub trait Store: JobStore + TaskStore + 'static {}

impl<T: JobStore + TaskStore + 'static> Store for T {}

/// Error message stored on a job whose tasks did not all succeed.
pub(crate) fn failed_tasks_message(progress: &JobProgress) -> Option<String> {
    (progress.failed > 0).then(|| format!("{} of {} tasks failed", progress.failed, progress.total))
}
