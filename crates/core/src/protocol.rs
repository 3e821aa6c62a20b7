//! Request/response shapes exchanged between the scheduler and the worker.
//!
//! A request with a payload starts work; a request without one polls it.

use serde::{Deserialize, Serialize};

use crate::model::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<TaskPayload>,
}

impl TaskRequest {
    pub fn start(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            payload: Some(TaskPayload {
                node_count: task.node_count,
                edges: task.edges.clone(),
                mapping: task.mapping.clone(),
            }),
        }
    }

    pub fn poll(id: impl Into<String>) -> Self {
        Self { id: id.into(), payload: None }
    }

    pub fn is_start(&self) -> bool {
        self.payload.is_some()
    }
}

/// One component in local coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub node_count: i32,
    /// Flat pairs of 1-based local node indices.
    pub edges: Vec<i32>,
    /// Local index to original node id.
    #[serde(default)]
    pub mapping: Vec<i32>,
}

impl TaskPayload {
    /// Render the edges as `from to` lines.
    pub fn to_edge_list(&self) -> String {
        let mut out = String::with_capacity(self.edges.len() * 4);
        for pair in self.edges.chunks_exact(2) {
            out.push_str(&format!("{} {}\n", pair[0], pair[1]));
        }
        out
    }
}

/// Worker-side progress of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Created,
    #[serde(alias = "processing")]
    Executing,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: String,
    pub status: WorkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, alias = "err", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResponse {
    pub fn new(id: impl Into<String>, status: WorkStatus) -> Self {
        Self { id: id.into(), status, result: None, error: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_request_omits_payload() {
        let json = serde_json::to_value(TaskRequest::poll("7")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "7" }));
    }

    #[test]
    fn test_processing_is_read_as_executing() {
        let resp: TaskResponse =
            serde_json::from_str(r#"{"id":"1","status":"processing"}"#).unwrap();
        assert_eq!(resp.status, WorkStatus::Executing);
        assert!(resp.result.is_none());
    }

    #[test]
    fn test_legacy_err_field_maps_to_error() {
        let resp: TaskResponse =
            serde_json::from_str(r#"{"id":"1","status":"completed","err":"boom"}"#).unwrap();
        assert_eq!(resp.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_edge_list_rendering() {
        let payload = TaskPayload { node_count: 3, edges: vec![1, 2, 2, 3], mapping: vec![4, 9, 2] };
        assert_eq!(payload.to_edge_list(), "1 2\n2 3\n");
    }
}
