//! HTTP surface of the worker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use graphsplit_core::protocol::{TaskRequest, TaskResponse};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::RunnerError;
use crate::runner::{DrainReport, WorkerRunner};

impl IntoResponse for RunnerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn build_router(runner: Arc<WorkerRunner>) -> Router {
    Router::new()
        .route("/", post(handle_task))
        .route("/api/tasks", post(handle_task))
        .route("/health", get(health))
        .with_state(runner)
}

/// Serve until `signal` resolves, then drain the runner while still
/// listening so late starts get 503 and polls keep answering. The listener
/// closes only after the drain.
pub async fn serve<F>(
    listener: TcpListener,
    runner: Arc<WorkerRunner>,
    grace: Duration,
    signal: F,
) -> std::io::Result<DrainReport>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (drained_tx, drained_rx) = oneshot::channel();
    let drain = {
        let runner = runner.clone();
        tokio::spawn(async move {
            signal.await;
            info!(?grace, "worker: shutdown signal received, draining");
            let report = runner.shutdown(grace).await;
            let _ = drained_tx.send(());
            report
        })
    };

    axum::serve(listener, build_router(runner))
        .with_graceful_shutdown(async move {
            let _ = drained_rx.await;
        })
        .await?;
    drain.await.map_err(std::io::Error::other)
}

/// POST /: start (payload present) or poll (payload absent) a task.
async fn handle_task(
    State(runner): State<Arc<WorkerRunner>>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskResponse>, RunnerError> {
    debug!(task_id = %request.id, start = request.is_start(), "worker: request");
    Ok(Json(runner.handle(request).await?))
}

async fn health(State(runner): State<Arc<WorkerRunner>>) -> impl IntoResponse {
    if runner.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down");
    }
    (StatusCode::OK, "OK")
}
