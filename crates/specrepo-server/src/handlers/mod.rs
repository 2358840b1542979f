//! HTTP request handlers.

pub(crate) mod spec;

use axum::http::Uri;

use crate::error::ServerError;

/// Fallback for paths no route matches.
pub(crate) async fn not_found(uri: Uri) -> ServerError {
    ServerError::EndpointNotFound(uri.path().to_owned())
}
