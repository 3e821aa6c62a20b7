use graphsplit_core::protocol::TaskRequest;
use graphsplit_core::Status;
use graphsplit_store::Store;
use tracing::info;
use uuid::Uuid;

use crate::client::WorkerClient;
use crate::error::SchedulerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Idle,
    Dispatched(Uuid),
}

/// Hand one random `created` task to the worker pool and mark it `executing`.
///
/// If the status update fails after the worker accepted the task, the task
/// is dispatched again later; workers answer a repeated start with the
/// current status instead of running it twice.
pub async fn dispatch_one<S: Store>(
    store: &S,
    client: &dyn WorkerClient,
) -> Result<DispatchOutcome, SchedulerError> {
    let Some(task) = store.get_task_by_status(Status::Created).await? else {
        return Ok(DispatchOutcome::Idle);
    };

    let response = client.send(&TaskRequest::start(&task)).await?;
    store.update_task_status(task.id, Status::Executing).await?;

    info!(
        task_id = %task.id,
        job_id = %task.job_id,
        nodes = task.node_count,
        worker_status = ?response.status,
        "scheduler: task dispatched"
    );
    Ok(DispatchOutcome::Dispatched(task.id))
}
