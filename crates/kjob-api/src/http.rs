use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use kjob_model::{ExecutionRequest, JobMetadata, JobSecrets};
use serde::Serialize;
use tracing::{info, warn};

use crate::{context::AppContext, error::ApiError, logs::stream_logs};

/// HTTP API service builder.
pub struct HttpApi {
    ctx: Arc<AppContext>,
}

impl HttpApi {
    /// Create new HTTP API over the given context.
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET /ping - Liveness probe
    /// - POST /jobs/execute - Run a catalog job
    /// - GET /jobs/logs?job_name=<id> - Follow an execution's output over WebSocket
    /// - POST /jobs/metadata - Register catalog entries
    /// - GET /jobs/metadata - List catalog entries
    /// - POST /jobs/secrets - Store a job's secret set
    pub fn router(self) -> Router {
        Router::new()
            .route("/ping", get(ping))
            .route("/jobs/execute", post(execute))
            .route("/jobs/logs", get(stream_logs))
            .route("/jobs/metadata", post(submit_metadata).get(list_metadata))
            .route("/jobs/secrets", post(submit_secrets))
            .with_state(self.ctx)
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct ExecuteResponse {
    name: String,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(v)| v).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejecting request body");
        ApiError::InvalidRequest(rejection.body_text())
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /ping
async fn ping() -> &'static str {
    "pong"
}

/// POST /jobs/execute
async fn execute(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<ExecutionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let id = ctx.executor.execute(request).await?;

    Ok((StatusCode::CREATED, Json(ExecuteResponse { name: id.into_inner() })))
}

/// POST /jobs/metadata
///
/// Entries are validated up front and stored in order; a store failure leaves
/// the entries before it in place.
async fn submit_metadata(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<Vec<JobMetadata>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = body(payload)?;
    for entry in &entries {
        entry.validate()?;
    }

    let count = entries.len();
    for entry in entries {
        ctx.metadata.put_metadata(entry).await?;
    }

    info!(count, "catalog entries stored");
    Ok(StatusCode::CREATED)
}

/// GET /jobs/metadata
async fn list_metadata(State(ctx): State<Arc<AppContext>>) -> Result<impl IntoResponse, ApiError> {
    let entries = ctx.metadata.list_metadata().await?;
    Ok(Json(entries))
}

/// POST /jobs/secrets
async fn submit_secrets(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<JobSecrets>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let secrets = body(payload)?;
    secrets.validate()?;

    let job = secrets.job_name.clone();
    ctx.secrets.put_secrets(secrets).await?;

    info!(job = %job, "secret set stored");
    Ok(StatusCode::CREATED)
}
