//! What actually runs for a task once its workspace is ready.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecError;
use crate::workspace::TaskDir;

/// Run one task inside its workspace.
///
/// `Ok(Some(output))` becomes `result.txt`; `Ok(None)` means the executor
/// already wrote it. An error becomes `error.txt`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, id: &str, dir: &TaskDir) -> Result<Option<String>, ExecError>;

    fn name(&self) -> &str;
}

/// Runs `<program> <args..> <graph.txt> <dir> <id>`.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn execute(&self, id: &str, dir: &TaskDir) -> Result<Option<String>, ExecError> {
        debug!(task_id = id, program = %self.program, "worker: launching command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(dir.graph_path())
            .arg(dir.path())
            .arg(id)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ExecError::Spawn)?;

        if !output.status.success() {
            return Err(ExecError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if dir.has_result().await {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    fn name(&self) -> &str {
        "command"
    }
}

/// Built-in executor: summarises the component's degree distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsExecutor;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentStats {
    pub nodes: usize,
    pub edges: usize,
    pub min_degree: usize,
    pub max_degree: usize,
    pub avg_degree: f64,
}

impl ComponentStats {
    /// Stats for `nodes` local nodes joined by `from to` lines.
    pub fn from_edge_list(nodes: usize, edge_list: &str) -> Result<Self, ExecError> {
        let mut degree = vec![0usize; nodes];
        let mut edges = 0;
        for (n, line) in edge_list.lines().enumerate() {
            let mut cols = line.split_whitespace();
            let (Some(a), Some(b)) = (cols.next(), cols.next()) else {
                if line.trim().is_empty() {
                    continue;
                }
                return Err(ExecError::Input(format!("line {}: expected two columns", n + 1)));
            };
            for token in [a, b] {
                let idx: usize = token
                    .parse()
                    .map_err(|_| ExecError::Input(format!("line {}: bad node {token:?}", n + 1)))?;
                let slot = idx
                    .checked_sub(1)
                    .and_then(|i| degree.get_mut(i))
                    .ok_or_else(|| ExecError::Input(format!("line {}: node {idx} out of range", n + 1)))?;
                *slot += 1;
            }
            edges += 1;
        }

        let avg_degree = if nodes == 0 { 0.0 } else { (2 * edges) as f64 / nodes as f64 };
        Ok(Self {
            nodes,
            edges,
            min_degree: degree.iter().copied().min().unwrap_or(0),
            max_degree: degree.iter().copied().max().unwrap_or(0),
            avg_degree,
        })
    }
}

#[async_trait]
impl Executor for StatsExecutor {
    async fn execute(&self, _id: &str, dir: &TaskDir) -> Result<Option<String>, ExecError> {
        let mapping = tokio::fs::read_to_string(dir.mapping_path()).await?;
        let nodes = mapping.lines().filter(|l| !l.trim().is_empty()).count();
        let graph = tokio::fs::read_to_string(dir.graph_path()).await?;

        let stats = ComponentStats::from_edge_list(nodes, &graph)?;
        let json = serde_json::to_string(&stats).map_err(|e| ExecError::Input(e.to_string()))?;
        Ok(Some(json))
    }

    fn name(&self) -> &str {
        "stats"
    }
}

#[cfg(test)]
mod tests {
    use graphsplit_core::protocol::TaskPayload;

    use super::*;
    use crate::workspace::Workspace;

    #[test]
    fn test_path_stats() {
        let stats = ComponentStats::from_edge_list(3, "1 2\n2 3\n").unwrap();
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.min_degree, 1);
        assert_eq!(stats.max_degree, 2);
        assert!((stats.avg_degree - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_singleton_stats() {
        let stats = ComponentStats::from_edge_list(1, "").unwrap();
        assert_eq!((stats.nodes, stats.edges, stats.max_degree), (1, 0, 0));
        assert_eq!(stats.avg_degree, 0.0);
    }

    #[test]
    fn test_out_of_range_node_is_input_error() {
        assert!(matches!(ComponentStats::from_edge_list(2, "1 3\n"), Err(ExecError::Input(_))));
        assert!(matches!(ComponentStats::from_edge_list(2, "0 1\n"), Err(ExecError::Input(_))));
    }

    #[tokio::test]
    async fn test_stats_executor_reads_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let payload = TaskPayload { node_count: 2, edges: vec![1, 2], mapping: vec![10, 20] };
        let dir = ws.create("s1", &payload).await.unwrap();

        let out = StatsExecutor.execute("s1", &dir).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["nodes"], 2);
        assert_eq!(value["edges"], 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_failure_carries_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let payload = TaskPayload { node_count: 1, edges: vec![], mapping: vec![1] };
        let dir = ws.create("c1", &payload).await.unwrap();

        let exec = CommandExecutor::new("sh", vec!["-c".into(), "echo nope >&2; exit 4".into()]);
        let err = exec.execute("c1", &dir).await.unwrap_err();
        assert!(matches!(err, ExecError::Failed { code: Some(4), ref stderr } if stderr == "nope"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_stdout_becomes_result() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let payload = TaskPayload { node_count: 1, edges: vec![], mapping: vec![1] };
        let dir = ws.create("c2", &payload).await.unwrap();

        // Trailing arguments bind to $0 (graph), $1 (dir) and $2 (id).
        let exec = CommandExecutor::new("sh", vec!["-c".into(), "echo \"done $2\"".into()]);
        let out = exec.execute("c2", &dir).await.unwrap();
        assert_eq!(out.as_deref(), Some("done c2\n"));
    }
}
