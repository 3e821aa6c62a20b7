//! Job ingestion and query handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use graphsplit_core::{JobProgress, JobSummary, Status, Task};
use graphsplit_store::Store;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::{bad_request, store_err, ApiError};
use crate::state::AppState;

/// Multipart field carrying the graph file.
pub const UPLOAD_FIELD: &str = "mtxfile";

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobSummary,
    pub progress: JobProgress,
}

/// POST /api/jobs: store an uploaded graph as a new job.
pub async fn upload_job<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.txt").to_string();
        let bytes = field.bytes().await.map_err(multipart_err)?;
        let content = String::from_utf8(bytes.to_vec())
            .map_err(|_| bad_request("uploaded file is not valid UTF-8"))?;

        let id = state.store.save_job(&filename, &content).await.map_err(store_err)?;
        info!(job_id = %id, filename = %filename, bytes = content.len(), "job uploaded");
        return Ok((
            StatusCode::CREATED,
            Json(json!({ "id": id, "message": "File uploaded successfully" })),
        ));
    }
    Err(bad_request(format!("missing multipart field '{UPLOAD_FIELD}'")))
}

fn multipart_err(e: axum::extract::multipart::MultipartError) -> ApiError {
    (e.status(), Json(json!({ "error": e.body_text() })))
}

/// GET /api/jobs?status=: newest first.
pub async fn list_jobs<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<JobSummary>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(Status::from_str)
        .transpose()
        .map_err(bad_request)?;
    let jobs = state.store.list_jobs(status).await.map_err(store_err)?;
    Ok(Json(jobs))
}

/// GET /api/jobs/{id}: summary plus task counts.
pub async fn get_job<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDetail>, ApiError> {
    let job = state.store.get_job_summary(id).await.map_err(store_err)?;
    let progress = state.store.job_progress(id).await.map_err(store_err)?;
    Ok(Json(JobDetail { job, progress }))
}

/// GET /api/jobs/{id}/download: the original upload.
pub async fn download_job<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.store.get_job(id).await.map_err(store_err)?;
    let filename: String = job
        .filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        job.content,
    ))
}

/// GET /api/jobs/{id}/tasks
pub async fn list_job_tasks<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    // Distinguish "no such job" from "job without tasks".
    state.store.get_job_summary(id).await.map_err(store_err)?;
    let tasks = state.store.list_tasks(id).await.map_err(store_err)?;
    Ok(Json(tasks))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use graphsplit_core::config::ServerConfig;
    use graphsplit_store::{JobStore, MemoryStore};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::router::build_router;

    const BOUNDARY: &str = "graphsplit-test-boundary";

    fn server_config(max_upload_bytes: usize) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origin: "*".into(),
            max_upload_bytes,
        }
    }

    fn app_with(store: Arc<MemoryStore>, max_upload_bytes: usize) -> Router {
        build_router(Arc::new(AppState::new(store)), &server_config(max_upload_bytes))
    }

    fn multipart_request(field: &str, filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: text/plain\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/jobs")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec(), headers)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn upload_creates_job_and_detail_shows_it() {
        let store = Arc::new(MemoryStore::new());
        let app = app_with(store.clone(), 1024 * 1024);

        let (status, body, _) = send(&app, multipart_request("mtxfile", "g.mtx", "1 2\n2 3\n")).await;
        assert_eq!(status, StatusCode::CREATED);
        let body: Value = serde_json::from_slice(&body).unwrap();
        let id = body["id"].as_str().unwrap().to_string();
        assert_eq!(body["message"], "File uploaded successfully");

        let (status, body, _) = send(&app, get(&format!("/api/jobs/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        let detail: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(detail["filename"], "g.mtx");
        assert_eq!(detail["status"], "created");
        assert_eq!(detail["progress"]["total"], 0);
        assert!(detail.get("content").is_none());
    }

    #[tokio::test]
    async fn upload_without_file_field_is_400() {
        let app = app_with(Arc::new(MemoryStore::new()), 1024);
        let (status, body, _) = send(&app, multipart_request("other", "g.txt", "1 2\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("mtxfile"));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let app = app_with(store.clone(), 64);
        let big = "1 2\n".repeat(100);
        let (status, _, _) = send(&app, multipart_request("mtxfile", "big.txt", &big)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(store.list_jobs(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = Arc::new(MemoryStore::new());
        store.save_job("a.txt", "1 2\n").await.unwrap();
        store.save_job("b.txt", "3 4\n").await.unwrap();
        let app = app_with(store, 1024);

        let (status, body, _) = send(&app, get("/api/jobs?status=created")).await;
        assert_eq!(status, StatusCode::OK);
        let jobs: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0]["filename"], "b.txt");

        let (_, body, _) = send(&app, get("/api/jobs?status=completed")).await;
        let jobs: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert!(jobs.is_empty());

        let (status, _, _) = send(&app, get("/api/jobs?status=exploded")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn download_returns_raw_content_as_attachment() {
        let store = Arc::new(MemoryStore::new());
        let id = store.save_job("graph \"1\".txt", "% c\n1 2\n").await.unwrap();
        let app = app_with(store, 1024);

        let (status, body, headers) = send(&app, get(&format!("/api/jobs/{id}/download"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"% c\n1 2\n");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"graph _1_.txt\""
        );
    }

    #[tokio::test]
    async fn unknown_job_is_404_everywhere() {
        let app = app_with(Arc::new(MemoryStore::new()), 1024);
        let id = Uuid::new_v4();
        for uri in [
            format!("/api/jobs/{id}"),
            format!("/api/jobs/{id}/download"),
            format!("/api/jobs/{id}/tasks"),
        ] {
            let (status, body, _) = send(&app, get(&uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert!(body["error"].as_str().is_some());
        }
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = app_with(Arc::new(MemoryStore::new()), 1024);
        let (status, body, _) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }
}
