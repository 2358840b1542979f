//! Spec document endpoints.
//!
//! Every mounted root serves, relative to its mount path:
//!
//! - `GET openapi.json` and `GET openapi.yaml`: the bundled document
//! - `GET editor/openapi.yaml`: the text offered to a document editor
//! - `PUT backend_openapi.yaml`: an edited document, synced into the root

use std::sync::{Arc, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use md5::{Digest, Md5};
use specrepo_core::{
    BundleOptions, CHILDREN_KEY, SpecError, SyncContext, SyncInput, bundle, editable_text, sync,
};
use specrepo_storage::{Format, SpecRoot, stringify};

use crate::error::ServerError;
use crate::state::AppState;

const JSON_CONTENT_TYPE: &str = "application/json";
const YAML_CONTENT_TYPE: &str = "application/yaml";

/// Handle GET /{path}.
pub(crate) async fn get_spec(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let request_path = format!("/{path}");
    let (mount, rest) = state
        .registry
        .resolve(&request_path)
        .ok_or_else(|| ServerError::MountNotFound(request_path.clone()))?;

    match rest.as_str() {
        "openapi.json" => bundled(&state, &mount.root, Format::Json, &headers),
        "openapi.yaml" => bundled(&state, &mount.root, Format::Yaml, &headers),
        "editor/openapi.yaml" => {
            let text = editable_text(&mount.root, &state.pipeline)?;
            Ok(([(header::CONTENT_TYPE, YAML_CONTENT_TYPE)], text).into_response())
        }
        _ => Err(ServerError::EndpointNotFound(request_path)),
    }
}

/// Handle PUT /{path}.
pub(crate) async fn put_spec(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Response, ServerError> {
    let request_path = format!("/{path}");
    let (mount, rest) = state
        .registry
        .resolve(&request_path)
        .ok_or_else(|| ServerError::MountNotFound(request_path.clone()))?;
    if rest != "backend_openapi.yaml" {
        return Err(ServerError::EndpointNotFound(request_path));
    }

    let _guard = state.sync_lock.lock().unwrap_or_else(PoisonError::into_inner);
    let context = SyncContext::new(&state.pipeline)
        .with_registry(&state.registry)
        .skip_plugins(state.bundle_options.skip_plugins);
    sync(SyncInput::Text(body), &mount.root, &context)?;
    tracing::info!(mount = %mount.path, "Synced spec from editor");

    Ok((StatusCode::OK, "ok").into_response())
}

/// Bundle `root` without children and render it in `format`.
fn bundled(
    state: &AppState,
    root: &SpecRoot,
    format: Format,
    headers: &HeaderMap,
) -> Result<Response, ServerError> {
    let options = BundleOptions {
        skip_children: true,
        ..state.bundle_options
    };
    let mut document = bundle(root, &options, &state.pipeline)?;
    if let Some(spec) = document.as_object_mut() {
        spec.shift_remove(CHILDREN_KEY);
    }
    let body = stringify(&document, format).map_err(SpecError::from)?;

    let etag = compute_etag(&state.version, &body);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && if_none_match.as_bytes() == etag.as_bytes()
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let content_type = match format {
        Format::Json => JSON_CONTENT_TYPE,
        Format::Yaml => YAML_CONTENT_TYPE,
    };
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_owned()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "no-cache".to_owned()),
        ],
        body,
    )
        .into_response())
}

/// Compute `ETag` from version and content.
///
/// Uses MD5 hash truncated to 64 bits (16 hex chars).
fn compute_etag(version: &str, content: &str) -> String {
    let hash = Md5::digest(format!("{version}:{content}").as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_etag_includes_version() {
        assert_ne!(
            compute_etag("1.0.0", "openapi: 3.0.0"),
            compute_etag("1.0.1", "openapi: 3.0.0")
        );
    }

    #[test]
    fn test_compute_etag_includes_content() {
        assert_ne!(
            compute_etag("1.0.0", "openapi: 3.0.0"),
            compute_etag("1.0.0", "openapi: 3.1.0")
        );
    }

    #[test]
    fn test_compute_etag_format() {
        let etag = compute_etag("1.0.0", "content");

        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
        assert_eq!(etag.len(), 18);
    }
}
