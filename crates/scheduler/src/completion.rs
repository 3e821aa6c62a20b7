use graphsplit_core::protocol::{TaskRequest, TaskResponse, WorkStatus};
use graphsplit_core::{Status, Task, TaskOutcome};
use graphsplit_store::Store;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::WorkerClient;
use crate::error::SchedulerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Idle,
    /// The worker is still on it.
    Pending(Uuid),
    Completed {
        task_id: Uuid,
        status: Status,
        /// Set when this completion finished the whole job.
        job_status: Option<Status>,
    },
}

/// A completed response with an error means the task failed.
pub fn outcome_from_response(response: TaskResponse) -> TaskOutcome {
    let status = if response.error.is_some() { Status::Failed } else { Status::Completed };
    TaskOutcome { status, error: response.error, result_ref: response.result }
}

/// Poll one random `executing` task and record its result once finished.
pub async fn poll_one<S: Store>(
    store: &S,
    client: &dyn WorkerClient,
) -> Result<PollOutcome, SchedulerError> {
    let Some(task) = store.get_task_by_status(Status::Executing).await? else {
        return Ok(PollOutcome::Idle);
    };

    let response = client.send(&TaskRequest::poll(task.id.to_string())).await?;
    if response.status != WorkStatus::Completed {
        debug!(task_id = %task.id, status = ?response.status, "scheduler: task still running");
        return Ok(PollOutcome::Pending(task.id));
    }

    let outcome = outcome_from_response(response);
    let job_status = record(store, &task, &outcome).await?;

    match outcome.status {
        Status::Failed => warn!(
            task_id = %task.id,
            job_id = %task.job_id,
            error = outcome.error.as_deref().unwrap_or_default(),
            "scheduler: task failed"
        ),
        _ => info!(task_id = %task.id, job_id = %task.job_id, "scheduler: task completed"),
    }
    if let Some(status) = job_status {
        info!(job_id = %task.job_id, status = %status, "scheduler: job finished");
    }

    Ok(PollOutcome::Completed { task_id: task.id, status: outcome.status, job_status })
}

async fn record<S: Store>(
    store: &S,
    task: &Task,
    outcome: &TaskOutcome,
) -> Result<Option<Status>, SchedulerError> {
    let mut tx = store.begin().await?;
    let applied = async {
        store.complete_task_in_tx(&mut tx, task.id, outcome).await?;
        store.finish_job_if_done(&mut tx, task.job_id).await
    }
    .await;

    match applied {
        Ok(job_status) => {
            store.commit(tx).await?;
            Ok(job_status)
        }
        Err(e) => {
            if let Err(rb) = store.rollback(tx).await {
                warn!(task_id = %task.id, error = %rb, "scheduler: rollback failed");
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_means_failed() {
        let mut response = TaskResponse::new("1", WorkStatus::Completed);
        response.error = Some("exit status 2".into());
        let outcome = outcome_from_response(response);
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.error.as_deref(), Some("exit status 2"));
    }

    #[test]
    fn test_result_is_kept_as_reference() {
        let mut response = TaskResponse::new("1", WorkStatus::Completed);
        response.result = Some("{\"nodes\":3}".into());
        let outcome = outcome_from_response(response);
        assert_eq!(outcome.status, Status::Completed);
        assert_eq!(outcome.result_ref.as_deref(), Some("{\"nodes\":3}"));
    }
}
