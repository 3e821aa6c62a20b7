//! Admission, execution and polling of tasks on one worker.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use graphsplit_core::protocol::{TaskPayload, TaskRequest, TaskResponse, WorkStatus};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, warn};

use crate::error::RunnerError;
use crate::executor::Executor;
use crate::workspace::{TaskDir, TaskState, Workspace};

/// Error recorded for a task whose execution did not survive this process.
pub const INTERRUPTED: &str = "task interrupted before completion";

/// Ids executing in this process.
type Running = Arc<Mutex<HashSet<String>>>;

/// Runs at most `max_concurrent` tasks; further starts are refused, never queued.
///
/// A workspace without an outcome file whose id is not in `running` is an
/// orphan: left by a previous process, a panic or a failed write.
pub struct WorkerRunner {
    workspace: Workspace,
    executor: Arc<dyn Executor>,
    permits: Arc<Semaphore>,
    max_concurrent: u32,
    running: Running,
    shutting_down: AtomicBool,
}

/// How graceful shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReport {
    Drained,
    TimedOut { in_flight: usize },
}

impl WorkerRunner {
    pub fn new(workspace: Workspace, executor: Arc<dyn Executor>, max_concurrent: u32) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            workspace,
            executor,
            permits: Arc::new(Semaphore::new(max_concurrent as usize)),
            max_concurrent,
            running: Arc::new(Mutex::new(HashSet::new())),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    pub fn in_flight(&self) -> usize {
        self.max_concurrent as usize - self.permits.available_permits()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Payload present starts the task, absent polls it.
    pub async fn handle(&self, request: TaskRequest) -> Result<TaskResponse, RunnerError> {
        match request.payload {
            Some(payload) => self.start(&request.id, &payload).await,
            None => self.poll(&request.id).await,
        }
    }

    /// Accept a task and run it in the background.
    ///
    /// A task seen before is not run again; the answer is its poll status.
    /// An orphaned workspace is discarded and the task runs from `payload`.
    pub async fn start(&self, id: &str, payload: &TaskPayload) -> Result<TaskResponse, RunnerError> {
        if self.is_shutting_down() {
            return Err(RunnerError::ShuttingDown);
        }
        let mut running = self.running.lock().await;
        let orphan = match self.workspace.open(id).await? {
            Some(dir) => {
                let state = dir.state().await?;
                if state != TaskState::Running || running.contains(id) {
                    return Ok(Self::response(id, state));
                }
                Some(dir)
            }
            None => None,
        };

        let permit = self.permits.clone().try_acquire_owned().map_err(|_| RunnerError::Saturated)?;
        if let Some(dir) = orphan {
            warn!(task_id = id, "worker: restarting orphaned task");
            dir.remove().await?;
        }
        let dir = self.workspace.create(id, payload).await?;
        running.insert(id.to_string());
        drop(running);

        info!(task_id = id, nodes = payload.node_count, executor = self.executor.name(), "worker: task started");
        tokio::spawn(run(self.executor.clone(), id.to_string(), dir, self.running.clone(), permit));
        Ok(TaskResponse::new(id, WorkStatus::Created))
    }

    /// Report a task's state from its workspace. Never triggers execution.
    ///
    /// An orphan is settled as failed so the caller sees a terminal state.
    pub async fn poll(&self, id: &str) -> Result<TaskResponse, RunnerError> {
        let running = self.running.lock().await;
        let dir = self
            .workspace
            .open(id)
            .await?
            .ok_or_else(|| RunnerError::UnknownTask(id.to_string()))?;
        let state = dir.state().await?;
        if state == TaskState::Running && !running.contains(id) {
            warn!(task_id = id, "worker: orphaned task settled as failed");
            dir.write_error(INTERRUPTED).await?;
            return Ok(Self::response(id, TaskState::Failed(INTERRUPTED.to_string())));
        }
        Ok(Self::response(id, state))
    }

    fn response(id: &str, state: TaskState) -> TaskResponse {
        match state {
            TaskState::Running => TaskResponse::new(id, WorkStatus::Executing),
            TaskState::Done(result) => TaskResponse {
                result: Some(result),
                ..TaskResponse::new(id, WorkStatus::Completed)
            },
            TaskState::Failed(error) => TaskResponse {
                error: Some(error),
                ..TaskResponse::new(id, WorkStatus::Completed)
            },
        }
    }

    /// Refuse new starts, then wait up to `grace` for running tasks.
    pub async fn shutdown(&self, grace: Duration) -> DrainReport {
        self.shutting_down.store(true, Ordering::SeqCst);
        match tokio::time::timeout(grace, self.permits.acquire_many(self.max_concurrent)).await {
            Ok(Ok(_all)) => {
                info!("worker: drained");
                DrainReport::Drained
            }
            Ok(Err(_closed)) => DrainReport::Drained,
            Err(_) => {
                let in_flight = self.in_flight();
                warn!(in_flight, "worker: shutdown timed out with tasks in flight");
                DrainReport::TimedOut { in_flight }
            }
        }
    }
}

async fn run(
    executor: Arc<dyn Executor>,
    id: String,
    dir: TaskDir,
    running: Running,
    _permit: OwnedSemaphorePermit,
) {
    let outcome = {
        let (id, dir) = (id.clone(), dir.clone());
        tokio::spawn(async move { executor.execute(&id, &dir).await }).await
    };
    let written = match outcome {
        Ok(Ok(Some(output))) => dir.write_result(&output).await,
        Ok(Ok(None)) => Ok(()),
        Ok(Err(e)) => {
            warn!(task_id = %id, error = %e, "worker: task failed");
            dir.write_error(&e.to_string()).await
        }
        Err(e) => {
            error!(task_id = %id, error = %e, "worker: executor aborted");
            dir.write_error(&format!("executor aborted: {e}")).await
        }
    };
    match written {
        Ok(()) => info!(task_id = %id, "worker: task finished"),
        // The next poll settles the orphan.
        Err(e) => error!(task_id = %id, error = %e, "worker: could not record task outcome"),
    }
    running.lock().await.remove(&id);
}
