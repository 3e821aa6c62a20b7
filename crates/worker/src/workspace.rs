//! Per-task directories under the worker root.
//!
//! Layout of `<root>/graph-<id>/`:
//! - `graph.txt`: edges as `from to` lines in local indices
//! - `mapping.txt`: one original node id per line, local index order
//! - `result.txt` or `error.txt`: written once the task finishes
//!
//! The presence of those last two files is the task state. Whether a task
//! without either is still alive is the runner's concern.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use graphsplit_core::protocol::TaskPayload;

use crate::error::WorkspaceError;

pub const GRAPH_FILE: &str = "graph.txt";
pub const MAPPING_FILE: &str = "mapping.txt";
pub const RESULT_FILE: &str = "result.txt";
pub const ERROR_FILE: &str = "error.txt";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

/// State derived from the files in a task directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Done(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TaskDir {
    path: PathBuf,
}

fn validate_id(id: &str) -> Result<(), WorkspaceError> {
    let ok = !id.is_empty()
        && id.len() <= 128
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok { Ok(()) } else { Err(WorkspaceError::InvalidId(id.to_string())) }
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<(), WorkspaceError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn dir_for(&self, id: &str) -> Result<PathBuf, WorkspaceError> {
        validate_id(id)?;
        Ok(self.root.join(format!("graph-{id}")))
    }

    /// Create the directory for `id` and persist its payload.
    ///
    /// Fails with [`WorkspaceError::Exists`] if the task was seen before.
    pub async fn create(&self, id: &str, payload: &TaskPayload) -> Result<TaskDir, WorkspaceError> {
        let path = self.dir_for(id)?;
        tokio::fs::create_dir_all(&self.root).await?;
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(WorkspaceError::Exists(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let dir = TaskDir { path };
        if let Err(e) = dir.write_payload(payload).await {
            let _ = dir.remove().await;
            return Err(e);
        }
        Ok(dir)
    }

    /// The directory of a known task, or `None`.
    pub async fn open(&self, id: &str) -> Result<Option<TaskDir>, WorkspaceError> {
        let path = self.dir_for(id)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(Some(TaskDir { path })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

async fn read_if_exists(path: &Path) -> Result<Option<String>, WorkspaceError> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl TaskDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn graph_path(&self) -> PathBuf {
        self.path.join(GRAPH_FILE)
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.path.join(MAPPING_FILE)
    }

    async fn write_payload(&self, payload: &TaskPayload) -> Result<(), WorkspaceError> {
        let mapping: String = payload.mapping.iter().map(|n| format!("{n}\n")).collect();
        tokio::fs::write(self.graph_path(), payload.to_edge_list()).await?;
        tokio::fs::write(self.mapping_path(), mapping).await?;
        Ok(())
    }

    /// Delete the directory and everything in it.
    pub async fn remove(&self) -> Result<(), WorkspaceError> {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn state(&self) -> Result<TaskState, WorkspaceError> {
        if let Some(result) = read_if_exists(&self.path.join(RESULT_FILE)).await? {
            return Ok(TaskState::Done(result));
        }
        if let Some(error) = read_if_exists(&self.path.join(ERROR_FILE)).await? {
            return Ok(TaskState::Failed(error));
        }
        Ok(TaskState::Running)
    }

    pub async fn has_result(&self) -> bool {
        tokio::fs::metadata(self.path.join(RESULT_FILE)).await.is_ok()
    }

    pub async fn write_result(&self, result: &str) -> Result<(), WorkspaceError> {
        self.publish(RESULT_FILE, result).await
    }

    pub async fn write_error(&self, error: &str) -> Result<(), WorkspaceError> {
        self.publish(ERROR_FILE, error).await
    }

    // Write then rename so a poll never reads a half-written file.
    async fn publish(&self, name: &str, contents: &str) -> Result<(), WorkspaceError> {
        let tmp = self.path.join(format!(".{name}.tmp"));
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, self.path.join(name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> TaskPayload {
        TaskPayload { node_count: 3, edges: vec![1, 2, 2, 3], mapping: vec![7, 8, 9] }
    }

    #[tokio::test]
    async fn test_create_writes_payload_files() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let dir = ws.create("abc-1", &payload()).await.unwrap();

        assert!(dir.path().ends_with("graph-abc-1"));
        assert_eq!(std::fs::read_to_string(dir.graph_path()).unwrap(), "1 2\n2 3\n");
        assert_eq!(std::fs::read_to_string(dir.mapping_path()).unwrap(), "7\n8\n9\n");
        assert_eq!(dir.state().await.unwrap(), TaskState::Running);
    }

    #[tokio::test]
    async fn test_second_create_reports_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        ws.create("t", &payload()).await.unwrap();
        assert!(matches!(ws.create("t", &payload()).await, Err(WorkspaceError::Exists(_))));
    }

    #[tokio::test]
    async fn test_result_wins_over_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let dir = ws.create("t", &payload()).await.unwrap();
        dir.write_error("boom").await.unwrap();
        assert_eq!(dir.state().await.unwrap(), TaskState::Failed("boom".into()));
        dir.write_result("ok").await.unwrap();
        assert_eq!(dir.state().await.unwrap(), TaskState::Done("ok".into()));
    }

    #[tokio::test]
    async fn test_unwritable_payload_then_remove_frees_the_id() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let dir = TaskDir { path: tmp.path().join("graph-u") };
        std::fs::create_dir(dir.path()).unwrap();
        // A directory where the graph file belongs makes the write fail.
        std::fs::create_dir(dir.graph_path()).unwrap();
        assert!(dir.write_payload(&payload()).await.is_err());

        dir.remove().await.unwrap();
        assert!(ws.open("u").await.unwrap().is_none());
        dir.remove().await.unwrap();
        let fresh = ws.create("u", &payload()).await.unwrap();
        assert_eq!(fresh.state().await.unwrap(), TaskState::Running);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        assert!(matches!(ws.open("../etc").await, Err(WorkspaceError::InvalidId(_))));
        assert!(matches!(ws.open("").await, Err(WorkspaceError::InvalidId(_))));
        assert!(ws.open("missing").await.unwrap().is_none());
    }
}
