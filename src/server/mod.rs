//! HTTP transport for the job manager.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::error::JobError;
use crate::manager::{Job, JobManager};

#[derive(Deserialize)]
struct StartRequest {
    command: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Serialize)]
struct StartResponse {
    id: u64,
}

#[derive(Deserialize)]
struct StopRequest {
    id: u64,
}

#[derive(Serialize)]
struct AllStatusResponse {
    jobs: Vec<Job>,
}

/// Builds the API router around a manager.
pub fn router(manager: JobManager) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/start", post(start_handler))
        .route("/stop", post(stop_handler))
        .route("/status", get(all_status_handler))
        .route("/status/{id}", get(status_handler))
        .layer(cors)
        .with_state(manager)
}

/// Runs the HTTP server until the shutdown token fires.
pub async fn run(
    config: ServerConfig,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = JobManager::with_grace_period(config.grace_period);
    let app = router(manager);

    tracing::info!(addr = %config.listen_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

fn error_response(err: JobError) -> Response {
    let status = match err {
        JobError::JobNotFound(_) => StatusCode::NOT_FOUND,
        JobError::Launch { .. } | JobError::Kill { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn start_handler(
    State(manager): State<JobManager>,
    Json(req): Json<StartRequest>,
) -> Response {
    match manager.submit(req.command, req.args).await {
        Ok(id) => {
            tracing::info!(id, "/start: running job");
            Json(StartResponse { id }).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "/start failed");
            error_response(err)
        }
    }
}

async fn stop_handler(State(manager): State<JobManager>, Json(req): Json<StopRequest>) -> Response {
    match manager.stop(req.id).await {
        Ok(()) => {
            tracing::info!(id = req.id, "/stop: job stopped");
            Json(json!({})).into_response()
        }
        Err(err) => {
            tracing::error!(id = req.id, error = %err, "/stop failed");
            error_response(err)
        }
    }
}

async fn status_handler(State(manager): State<JobManager>, Path(id): Path<u64>) -> Response {
    match manager.status(id).await {
        Ok(job) => Json(job).into_response(),
        Err(err) => error_response(err),
    }
}

async fn all_status_handler(State(manager): State<JobManager>) -> Json<AllStatusResponse> {
    Json(AllStatusResponse {
        jobs: manager.all_jobs().await,
    })
}
