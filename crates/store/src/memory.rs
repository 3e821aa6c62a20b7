//! In-process store with the same contracts as [`crate::PgStore`].
//!
//! A transaction works on a private snapshot and records its operations; on
//! commit the operations are replayed against the live state, all or
//! nothing. Used by tests and local runs without a database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use graphsplit_core::{
    Job, JobNotifier, JobProgress, JobSummary, NewTask, Status, Task, TaskOutcome,
};
use graphsplit_graph::parse_dimensions;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{failed_tasks_message, JobStore, TaskStore, Transactional};

#[derive(Debug, Clone, Default)]
struct State {
    /// Insertion order is creation order.
    jobs: Vec<Job>,
    tasks: Vec<Task>,
}

#[derive(Debug, Clone)]
enum Op {
    SetJobStatus { id: Uuid, status: Status, error: Option<String> },
    InsertTask(Task),
    CompleteTask { id: Uuid, outcome: TaskOutcome },
}

impl State {
    fn job_mut(&mut self, id: Uuid) -> Result<&mut Job, StoreError> {
        self.jobs.iter_mut().find(|j| j.id == id).ok_or(StoreError::JobNotFound(id))
    }

    fn task_mut(&mut self, id: Uuid) -> Result<&mut Task, StoreError> {
        self.tasks.iter_mut().find(|t| t.id == id).ok_or(StoreError::TaskNotFound(id))
    }

    fn progress(&self, job_id: Uuid) -> JobProgress {
        JobProgress::from_statuses(
            self.tasks.iter().filter(|t| t.job_id == job_id).map(|t| t.status),
        )
    }

    fn apply(&mut self, op: &Op) -> Result<(), StoreError> {
        match op {
            Op::SetJobStatus { id, status, error } => {
                let job = self.job_mut(*id)?;
                job.status = job.status.transition(*status)?;
                if error.is_some() {
                    job.error = error.clone();
                }
            }
            Op::InsertTask(task) => {
                self.job_mut(task.job_id)?;
                self.tasks.push(task.clone());
            }
            Op::CompleteTask { id, outcome } => {
                let task = self.task_mut(*id)?;
                task.status = task.status.transition(outcome.status)?;
                if outcome.error.is_some() {
                    task.error = outcome.error.clone();
                }
                if outcome.result_ref.is_some() {
                    task.result_ref = outcome.result_ref.clone();
                }
                task.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}

/// Pending transaction of a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    view: State,
    ops: Vec<Op>,
    inserted: usize,
}

impl MemoryTx {
    fn stage(&mut self, op: Op) -> Result<(), StoreError> {
        self.view.apply(&op)?;
        self.ops.push(op);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    notifier: Option<JobNotifier>,
    fail_insert_at: Mutex<Option<usize>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifier(mut self, notifier: JobNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Make the `n`-th task insert (0-based) of every transaction fail.
    pub fn fail_task_insert_at(&self, n: Option<usize>) {
        *self.fail_insert_at.lock().unwrap_or_else(PoisonError::into_inner) = n;
    }

    /// Make every operation fail as if the backend were unreachable.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        Ok(())
    }

    /// Every task of every job, for assertions.
    pub fn all_tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }
}

#[async_trait]
impl Transactional for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        self.check_available()?;
        Ok(MemoryTx { view: self.lock().clone(), ops: Vec::new(), inserted: 0 })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), StoreError> {
        self.check_available()?;
        let mut live = self.lock();
        let mut next = live.clone();
        for op in &tx.ops {
            next.apply(op)?;
        }
        *live = next;
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn save_job(&self, filename: &str, content: &str) -> Result<Uuid, StoreError> {
        self.check_available()?;
        let job = Job {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            content: content.to_string(),
            dimensions: parse_dimensions(content),
            status: Status::Created,
            error: None,
            result_ref: None,
            created_at: Utc::now(),
        };
        let id = job.id;
        self.lock().jobs.push(job);
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
        Ok(id)
    }

    async fn get_job(&self, id: Uuid) -> Result<Job, StoreError> {
        self.check_available()?;
        self.lock().job_mut(id).map(|j| j.clone())
    }

    async fn get_job_summary(&self, id: Uuid) -> Result<JobSummary, StoreError> {
        self.check_available()?;
        self.lock().job_mut(id).map(|j| JobSummary::from(&*j))
    }

    async fn list_jobs(&self, status: Option<Status>) -> Result<Vec<JobSummary>, StoreError> {
        self.check_available()?;
        Ok(self
            .lock()
            .jobs
            .iter()
            .rev()
            .filter(|j| status.map_or(true, |s| j.status == s))
            .map(JobSummary::from)
            .collect())
    }

    async fn next_pending_job(&self) -> Result<Option<Job>, StoreError> {
        self.check_available()?;
        Ok(self
            .lock()
            .jobs
            .iter()
            .find(|j| j.status == Status::Created && j.error.is_none())
            .cloned())
    }

    async fn record_job_error(&self, id: Uuid, message: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock().job_mut(id)?.error = Some(message.to_string());
        Ok(())
    }

    async fn set_job_status(&self, tx: &mut MemoryTx, id: Uuid, status: Status) -> Result<(), StoreError> {
        self.check_available()?;
        tx.stage(Op::SetJobStatus { id, status, error: None })
    }

    async fn finish_job_if_done(&self, tx: &mut MemoryTx, id: Uuid) -> Result<Option<Status>, StoreError> {
        self.check_available()?;
        let progress = tx.view.progress(id);
        let Some(status) = progress.final_status() else {
            return Ok(None);
        };
        if tx.view.job_mut(id)?.status != Status::Executing {
            return Ok(None);
        }
        tx.stage(Op::SetJobStatus { id, status, error: failed_tasks_message(&progress) })?;
        Ok(Some(status))
    }

    async fn job_progress(&self, id: Uuid) -> Result<JobProgress, StoreError> {
        self.check_available()?;
        Ok(self.lock().progress(id))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, tx: &mut MemoryTx, job_id: Uuid, task: &NewTask) -> Result<Uuid, StoreError> {
        self.check_available()?;
        let fail_at = *self.fail_insert_at.lock().unwrap_or_else(PoisonError::into_inner);
        if fail_at == Some(tx.inserted) {
            return Err(StoreError::Unavailable(format!("injected failure on task insert {}", tx.inserted)));
        }
        let now = Utc::now();
        let row = Task {
            id: Uuid::new_v4(),
            job_id,
            node_count: task.node_count,
            edges: task.edges.clone(),
            mapping: task.mapping.clone(),
            status: Status::Created,
            error: None,
            result_ref: None,
            created_at: now,
            updated_at: now,
        };
        let id = row.id;
        tx.stage(Op::InsertTask(row))?;
        tx.inserted += 1;
        Ok(id)
    }

    async fn get_task_by_status(&self, status: Status) -> Result<Option<Task>, StoreError> {
        self.check_available()?;
        let state = self.lock();
        let candidates: Vec<&Task> = state.tasks.iter().filter(|t| t.status == status).collect();
        Ok(candidates.choose(&mut rand::thread_rng()).map(|t| (*t).clone()))
    }

    async fn update_task_status(&self, id: Uuid, status: Status) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.lock();
        let task = state.task_mut(id)?;
        task.status = task.status.transition(status)?;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn complete_task_in_tx(
        &self,
        tx: &mut MemoryTx,
        id: Uuid,
        outcome: &TaskOutcome,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        tx.stage(Op::CompleteTask { id, outcome: outcome.clone() })
    }

    async fn list_tasks(&self, job_id: Uuid) -> Result<Vec<Task>, StoreError> {
        self.check_available()?;
        Ok(self.lock().tasks.iter().filter(|t| t.job_id == job_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphsplit_core::job_channel;

    fn new_task(mapping: Vec<i32>, edges: Vec<i32>) -> NewTask {
        NewTask { node_count: mapping.len() as i32, mapping, edges }
    }

    #[tokio::test]
    async fn test_save_job_notifies_and_computes_dimensions() {
        let (notifier, mut signals) = job_channel(4);
        let store = MemoryStore::new().with_notifier(notifier);
        let id = store
            .save_job("g.mtx", "%%MatrixMarket matrix coordinate pattern general\n3 3 1\n1 2\n")
            .await
            .unwrap();
        assert_eq!(signals.recv().await, Some(()));
        let job = store.get_job(id).await.unwrap();
        assert_eq!(job.dimensions, "3x3");
        assert_eq!(job.status, Status::Created);
    }

    #[tokio::test]
    async fn test_list_jobs_newest_first_and_filtered() {
        let store = MemoryStore::new();
        let a = store.save_job("a", "1 2\n").await.unwrap();
        let b = store.save_job("b", "1 2\n").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        store.schedule_job(&mut tx, a).await.unwrap();
        store.commit(tx).await.unwrap();

        let all: Vec<_> = store.list_jobs(None).await.unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(all, vec![b, a]);
        let executing = store.list_jobs(Some(Status::Executing)).await.unwrap();
        assert_eq!(executing.len(), 1);
        assert_eq!(executing[0].id, a);
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_tasks() {
        let store = MemoryStore::new();
        let job = store.save_job("a", "1 2\n").await.unwrap();
        let mut tx = store.begin().await.unwrap();
        store.create_task(&mut tx, job, &new_task(vec![1, 2], vec![1, 2])).await.unwrap();
        store.schedule_job(&mut tx, job).await.unwrap();
        store.rollback(tx).await.unwrap();

        assert!(store.list_tasks(job).await.unwrap().is_empty());
        assert_eq!(store.get_job(job).await.unwrap().status, Status::Created);
    }

    #[tokio::test]
    async fn test_injected_insert_failure() {
        let store = MemoryStore::new();
        let job = store.save_job("a", "1 2\n").await.unwrap();
        store.fail_task_insert_at(Some(1));
        let mut tx = store.begin().await.unwrap();
        store.create_task(&mut tx, job, &new_task(vec![1], vec![])).await.unwrap();
        let err = store.create_task(&mut tx, job, &new_task(vec![2], vec![])).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_task_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update_task_status(Uuid::new_v4(), Status::Executing).await.unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_completing_twice_fails() {
        let store = MemoryStore::new();
        let job = store.save_job("a", "1 2\n").await.unwrap();
        let mut tx = store.begin().await.unwrap();
        let task = store.create_task(&mut tx, job, &new_task(vec![1, 2], vec![1, 2])).await.unwrap();
        store.schedule_job(&mut tx, job).await.unwrap();
        store.commit(tx).await.unwrap();
        store.update_task_status(task, Status::Executing).await.unwrap();

        let outcome = TaskOutcome { status: Status::Completed, error: None, result_ref: Some("r".into()) };
        let mut tx = store.begin().await.unwrap();
        store.complete_task_in_tx(&mut tx, task, &outcome).await.unwrap();
        assert_eq!(store.finish_job_if_done(&mut tx, job).await.unwrap(), Some(Status::Completed));
        store.commit(tx).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = store.complete_task_in_tx(&mut tx, task, &outcome).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition(_)));
        assert_eq!(store.get_job(job).await.unwrap().status, Status::Completed);
    }

    #[tokio::test]
    async fn test_pending_job_skips_recorded_errors() {
        let store = MemoryStore::new();
        let bad = store.save_job("bad", "x\n").await.unwrap();
        let good = store.save_job("good", "1 2\n").await.unwrap();
        assert_eq!(store.next_pending_job().await.unwrap().unwrap().id, bad);
        store.record_job_error(bad, "line 1").await.unwrap();
        assert_eq!(store.next_pending_job().await.unwrap().unwrap().id, good);
        assert_eq!(store.get_job(bad).await.unwrap().status, Status::Created);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_reads() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.get_task_by_status(Status::Created).await, Err(StoreError::Unavailable(_))));
        store.set_unavailable(false);
        assert!(store.get_task_by_status(Status::Created).await.unwrap().is_none());
    }
}
