//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use specrepo_core::SpecError;
use specrepo_storage::StorageError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No spec root is mounted for the request path.
    #[error("No spec mounted at {0}")]
    MountNotFound(String),

    /// The mount exists but serves nothing at this path.
    #[error("Not found: {0}")]
    EndpointNotFound(String),

    /// Bundle, split or sync failure.
    #[error(transparent)]
    Spec(#[from] SpecError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MountNotFound(_) | Self::EndpointNotFound(_) => StatusCode::NOT_FOUND,
            Self::Spec(SpecError::Storage(StorageError::Io { .. } | StorageError::Serialize { .. }))
            | Self::Spec(SpecError::UnmountedParent { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Spec(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = match &self {
            Self::MountNotFound(path) | Self::EndpointNotFound(path) => {
                json!({"error": "Not found", "path": path})
            }
            Self::Spec(e) => json!({"error": e.to_string()}),
        };

        (status, axum::Json(body)).into_response()
    }
}
