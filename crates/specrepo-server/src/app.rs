//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Largest accepted document body.
const MAX_SPEC_SIZE: usize = 10 * 1024 * 1024;

/// Create the application router.
///
/// Mount paths are resolved per request, so roots registered by a sync are
/// served without rebuilding the router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/{*path}",
            get(handlers::spec::get_spec).put(handlers::spec::put_spec),
        )
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_SPEC_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use specrepo_core::MULTI_FILE_NOTICE;
    use specrepo_storage::document::read_document;
    use std::fs;
    use std::path::Path;
    use tower::ServiceExt;

    use crate::{ServerConfig, build_state};

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn router(dir: &Path) -> Router {
        let config = ServerConfig {
            basedir: dir.to_path_buf(),
            plugins_dir: Some(dir.join("plugins")),
            version: "1.0.0".to_owned(),
            ..ServerConfig::default()
        };
        create_router(Arc::new(build_state(&config).unwrap()))
    }

    async fn send(router: &Router, method: Method, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_owned()))
            .unwrap();
        router.clone().oneshot(request).await.unwrap()
    }

    async fn get(router: &Router, uri: &str) -> Response {
        send(router, Method::GET, uri, "").await
    }

    async fn text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        serde_json::from_str(&text(response).await).unwrap()
    }

    fn pets_root(dir: &Path) {
        write(dir, "openapi.yaml", "openapi: 3.0.0\ninfo:\n  title: Pets\n");
        write(dir, "paths/pets.yaml", "get:\n  summary: List pets\n");
        write(dir, "v2/openapi.yaml", "openapi: 3.0.0\ninfo:\n  title: Pets v2\n");
    }

    #[tokio::test]
    async fn test_get_openapi_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        pets_root(temp_dir.path());
        let router = router(temp_dir.path());

        let response = get(&router, "/openapi.json").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(response.headers().contains_key(header::ETAG));
        assert_eq!(
            json_body(response).await,
            json!({
                "openapi": "3.0.0",
                "info": {"title": "Pets"},
                "paths": {"/pets": {"get": {"summary": "List pets"}}}
            })
        );
    }

    #[tokio::test]
    async fn test_get_openapi_yaml_of_child_mount() {
        let temp_dir = tempfile::tempdir().unwrap();
        pets_root(temp_dir.path());
        let router = router(temp_dir.path());

        let response = get(&router, "/v2/openapi.yaml").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/yaml");
        let body = text(response).await;
        assert_eq!(
            specrepo_storage::parse(&body).unwrap(),
            json!({"openapi": "3.0.0", "info": {"title": "Pets v2"}})
        );
    }

    #[tokio::test]
    async fn test_if_none_match_returns_not_modified() {
        let temp_dir = tempfile::tempdir().unwrap();
        pets_root(temp_dir.path());
        let router = router(temp_dir.path());

        let first = get(&router, "/openapi.json").await;
        let etag = first.headers()[header::ETAG].clone();
        let request = Request::builder()
            .uri("/openapi.json")
            .header(header::IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        let second = router.clone().oneshot(request).await.unwrap();

        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_editor_text_keeps_single_file_verbatim() {
        let temp_dir = tempfile::tempdir().unwrap();
        let main = "# Pets\nopenapi: 3.0.0\ninfo: {title: Pets}  # short form\n";
        write(temp_dir.path(), "openapi.yaml", main);
        let router = router(temp_dir.path());

        let response = get(&router, "/editor/openapi.yaml").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, main);
    }

    #[tokio::test]
    async fn test_editor_text_of_fragmented_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        pets_root(temp_dir.path());
        let router = router(temp_dir.path());

        let body = text(get(&router, "/editor/openapi.yaml").await).await;

        assert!(body.starts_with(MULTI_FILE_NOTICE));
        assert!(body.contains("List pets"));
    }

    #[tokio::test]
    async fn test_put_syncs_and_mounts_new_child() {
        let temp_dir = tempfile::tempdir().unwrap();
        pets_root(temp_dir.path());
        let router = router(temp_dir.path());
        let document = "\
openapi: 3.0.0
info:
  title: Pets
paths:
  /pets:
    get:
      summary: All pets
children:
  v3:
    openapi: 3.0.0
    info:
      title: Pets v3
";

        let response = send(&router, Method::PUT, "/backend_openapi.yaml", document).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, "ok");
        assert_eq!(
            read_document(&temp_dir.path().join("paths/pets.yaml")).unwrap(),
            json!({"get": {"summary": "All pets"}})
        );
        let child = json_body(get(&router, "/v3/openapi.json").await).await;
        assert_eq!(child, json!({"openapi": "3.0.0", "info": {"title": "Pets v3"}, "paths": {}}));
        let root = json_body(get(&router, "/openapi.json").await).await;
        assert!(root.get("children").is_none());
        assert!(temp_dir.path().join("v2/openapi.yaml").is_file());
    }

    #[tokio::test]
    async fn test_put_invalid_document_is_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        pets_root(temp_dir.path());
        let router = router(temp_dir.path());

        let response =
            send(&router, Method::PUT, "/backend_openapi.yaml", "openapi: [3.0.0\n").await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Can not parse OpenAPI file"));
    }

    #[tokio::test]
    async fn test_conflict_is_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "openapi.yaml", "openapi: 3.0.0\npaths:\n  /pets: {}\n");
        write(temp_dir.path(), "paths/pets.yaml", "get: {}\n");
        let router = router(temp_dir.path());

        let response = get(&router, "/openapi.yaml").await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("All paths should be defined inside"));
    }

    #[tokio::test]
    async fn test_unknown_endpoints() {
        let temp_dir = tempfile::tempdir().unwrap();
        pets_root(temp_dir.path());
        let router = router(temp_dir.path());

        assert_eq!(get(&router, "/").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&router, "/v2/swagger.json").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            send(&router, Method::PUT, "/openapi.json", "openapi: 3.0.0\n").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_plugins_apply_to_served_bundle() {
        let temp_dir = tempfile::tempdir().unwrap();
        pets_root(temp_dir.path());
        write(
            temp_dir.path(),
            "plugins/brand.yaml",
            concat!(
                "pathExpression: $.info\non: [bundle]\n",
                "process:\n  - set: {field: x-logo, value: logo.png}\n",
            ),
        );
        let router = router(temp_dir.path());

        let body = json_body(get(&router, "/openapi.json").await).await;

        assert_eq!(body["info"]["x-logo"], "logo.png");
    }
}
