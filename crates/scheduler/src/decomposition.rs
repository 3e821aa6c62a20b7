//! One unit of decomposition work: pick a pending job, split it, schedule it.

use graphsplit_graph::{decompose, EncodedComponent, PartitionOptions};
use graphsplit_store::Store;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SchedulerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecomposeOutcome {
    /// No `created` job was waiting.
    Idle,
    /// Tasks were created and the job moved to `executing`.
    Scheduled { job_id: Uuid, tasks: usize },
    /// The content failed validation; the job stays `created` with an error.
    Rejected { job_id: Uuid, reason: String },
}

/// Decompose the oldest pending job.
///
/// Task inserts and the job status flip share one transaction: either every
/// component becomes a task and the job is `executing`, or nothing changes.
pub async fn decompose_next<S: Store>(
    store: &S,
    options: &PartitionOptions,
) -> Result<DecomposeOutcome, SchedulerError> {
    let Some(job) = store.next_pending_job().await? else {
        return Ok(DecomposeOutcome::Idle);
    };
    let job_id = job.id;
    debug!(job_id = %job_id, filename = %job.filename, "scheduler: decomposing job");

    let opts = options.clone();
    let split = tokio::task::spawn_blocking(move || decompose(&job.content, &job.dimensions, &opts))
        .await
        .map_err(|e| SchedulerError::Internal(format!("decomposition task failed: {e}")))?;

    let decomposition = match split {
        Ok(d) => d,
        Err(e) => {
            let reason = e.to_string();
            warn!(job_id = %job_id, error = %reason, "scheduler: job rejected");
            store.record_job_error(job_id, &reason).await?;
            return Ok(DecomposeOutcome::Rejected { job_id, reason });
        }
    };

    let mut tx = store.begin().await?;
    if let Err(e) = schedule(store, &mut tx, job_id, &decomposition.components).await {
        if let Err(rb) = store.rollback(tx).await {
            warn!(job_id = %job_id, error = %rb, "scheduler: rollback failed");
        }
        return Err(e);
    }
    store.commit(tx).await?;

    let tasks = decomposition.components.len();
    info!(
        job_id = %job_id,
        tasks,
        nodes = decomposition.node_count,
        edges = decomposition.edge_count,
        "scheduler: job decomposed"
    );
    Ok(DecomposeOutcome::Scheduled { job_id, tasks })
}

async fn schedule<S: Store>(
    store: &S,
    tx: &mut S::Tx,
    job_id: Uuid,
    components: &[EncodedComponent],
) -> Result<(), SchedulerError> {
    for component in components {
        store.create_task(tx, job_id, &component.clone().into()).await?;
    }
    store.schedule_job(tx, job_id).await?;
    if components.is_empty() {
        // Nothing to dispatch, so the job is already done.
        store.finish_job_if_done(tx, job_id).await?;
    }
    Ok(())
}
