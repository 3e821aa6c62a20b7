use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::Status;

/// One uploaded graph and its overall processing status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub filename: String,
    pub content: String,
    pub dimensions: String,
    pub status: Status,
    pub error: Option<String>,
    pub result_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A job without its raw content, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub filename: String,
    pub dimensions: String,
    pub status: Status,
    pub error: Option<String>,
    pub result_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            filename: job.filename.clone(),
            dimensions: job.dimensions.clone(),
            status: job.status,
            error: job.error.clone(),
            result_ref: job.result_ref.clone(),
            created_at: job.created_at,
        }
    }
}

/// One connected component of a job, scheduled independently.
///
/// `mapping[i]` is the original node id of local node `i`; `edges` holds
/// flat pairs of 1-based local indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub job_id: Uuid,
    pub node_count: i32,
    pub edges: Vec<i32>,
    pub mapping: Vec<i32>,
    pub status: Status,
    pub error: Option<String>,
    pub result_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub node_count: i32,
    pub mapping: Vec<i32>,
    pub edges: Vec<i32>,
}

/// What the compute pool reported for a finished task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub status: Status,
    pub error: Option<String>,
    pub result_ref: Option<String>,
}

/// Per-status task counts of one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub total: i64,
    pub created: i64,
    pub executing: i64,
    pub completed: i64,
    pub failed: i64,
}

impl JobProgress {
    pub fn from_statuses<I: IntoIterator<Item = Status>>(statuses: I) -> Self {
        let mut p = Self::default();
        for s in statuses {
            p.total += 1;
            match s {
                Status::Created => p.created += 1,
                Status::Executing => p.executing += 1,
                Status::Completed => p.completed += 1,
                Status::Failed => p.failed += 1,
            }
        }
        p
    }

    /// Whether every task reached a terminal status.
    pub fn is_done(&self) -> bool {
        self.created == 0 && self.executing == 0
    }

    /// Job status implied by finished tasks, `None` while work remains.
    pub fn final_status(&self) -> Option<Status> {
        if !self.is_done() {
            return None;
        }
        if self.failed > 0 { Some(Status::Failed) } else { Some(Status::Completed) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counts_and_final_status() {
        let p = JobProgress::from_statuses([Status::Completed, Status::Executing]);
        assert_eq!(p.total, 2);
        assert_eq!(p.final_status(), None);

        let p = JobProgress::from_statuses([Status::Completed, Status::Completed]);
        assert_eq!(p.final_status(), Some(Status::Completed));

        let p = JobProgress::from_statuses([Status::Completed, Status::Failed]);
        assert_eq!(p.final_status(), Some(Status::Failed));
    }
}
