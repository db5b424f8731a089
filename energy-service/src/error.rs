use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use energy_client::{StoreError, ValidationError};

/// Errors surfaced to HTTP callers as `{"error": "..."}`.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Validation(e) => tracing::debug!(error = %e, "request rejected"),
            Self::Store(e) => tracing::error!(error = %e, "store operation failed"),
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
