use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kjob_core::{ExecuteError, StoreError};
use kjob_model::ModelError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// HTTP status of this error.
    ///
    /// Lookup failures are classified by the store error behind them, the same
    /// way for metadata and secrets.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Execute(ExecuteError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            ApiError::Execute(ExecuteError::Submission { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Execute(e) => e.store_error().map_or(StatusCode::INTERNAL_SERVER_ERROR, store_status),
            ApiError::Store(e) => store_status(e),
        }
    }
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Unavailable(_) | StoreError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::InvalidRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Something went wrong".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
