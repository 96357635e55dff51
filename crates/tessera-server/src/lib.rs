//! Host-facing surface of Tessera.
//!
//! [`StorageBackend`] is what the archive server plugs in as its storage
//! area: `create`, `read_whole`, `read_range` and `remove`, where `remove` is
//! routed to the deferred deletion queue when delayed deletion is enabled.
//! The HTTP router exposes the effective configuration (with a whitelisted
//! hot-reload subset) and deletion statistics.

pub mod backend;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use backend::{StatusReport, StorageBackend};
pub use config::{ConfigurationUpdate, DelayedDeletionSettings, ServerConfig, StorageSettings};
pub use error::{ServerError, ServerResult};
pub use server::TesseraServer;

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tessera_store::NoopClassifier;
    use tessera_types::{BlobId, ContentKind};
    use tower::ServiceExt;

    use super::*;

    fn backend(dir: &Path, delayed: bool) -> Arc<StorageBackend> {
        let mut s = StorageSettings::default();
        s.enable = true;
        s.storage_directory = dir.join("root");
        s.mount_directory = dir.join("mount");
        s.delayed_deletion.enable = delayed;
        s.delayed_deletion.throttle_delay_ms = 5;
        Arc::new(StorageBackend::open(s, "archive-a", Arc::new(NoopClassifier)).unwrap())
    }

    async fn call(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = router::build_router(backend(dir.path(), false));
        let (status, body) = call(app, get("/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn configuration_endpoint_reports_effective_settings() {
        let dir = tempfile::tempdir().unwrap();
        let app = router::build_router(backend(dir.path(), true));
        let (status, body) = call(app, get("/tessera/configuration")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enable"], true);
        assert_eq!(body["storagePathFormat"], "FULL");
        assert_eq!(body["delayedDeletion"]["enable"], true);
        assert_eq!(body["delayedDeletion"]["throttleDelayMs"], 5);
        let queue = body["delayedDeletion"]["path"].as_str().unwrap();
        assert!(queue.ends_with("pending-deletions.archive-a.db"));
    }

    #[tokio::test]
    async fn configuration_update_applies_whitelist_only() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path(), true);
        let app = router::build_router(backend.clone());
        let mount = dir.path().join("mount-b");
        let body = serde_json::json!({
            "mountDirectory": mount,
            "storagePathFormat": "simple",
            "maxRetry": 5,
            "enable": false,
            "delayedDeletion": { "enable": false },
        })
        .to_string();

        let (status, effective) = call(app, post_json("/tessera/configuration", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(effective["storagePathFormat"], "SIMPLE");
        assert_eq!(effective["maxRetry"], 5);
        assert_eq!(effective["enable"], true);
        assert_eq!(effective["delayedDeletion"]["enable"], true);

        assert_eq!(backend.store().config().mount, mount);
        assert!(backend.deferred_deletion());
    }

    #[tokio::test]
    async fn malformed_update_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path(), false);
        let app = router::build_router(backend.clone());

        let request = post_json("/tessera/configuration", r#"{"mountDirectory":""}"#);
        let (status, body) = call(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("mount directory"));
        assert_eq!(backend.configuration().mount_directory, dir.path().join("mount"));
    }

    #[tokio::test]
    async fn undecodable_update_gets_json_error_body() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path(), false);
        let before = backend.configuration();

        for payload in [
            r#"{"storagePathFormat":"nested"}"#,
            r#"{"maxRetry":"abc"}"#,
            "not json",
        ] {
            let app = router::build_router(backend.clone());
            let response = app
                .oneshot(post_json("/tessera/configuration", payload))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "payload {payload}");
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/json"
            );
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert!(body["error"].is_string());
        }
        assert_eq!(backend.configuration(), before);
    }

    #[tokio::test]
    async fn status_counts_pending_deletions() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path(), true);
        for _ in 0..2 {
            let id = BlobId::generate();
            backend.create(id.as_str(), b"x").unwrap();
            backend.remove(id.as_str(), ContentKind::Primary).unwrap();
        }

        let app = router::build_router(backend);
        let (status, body) = call(app, get("/tessera/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filesPendingDeletion"], 2);
        assert_eq!(body["databaseServerIdentifier"], "archive-a");
    }

    #[tokio::test]
    async fn status_without_delayed_deletion_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let app = router::build_router(backend(dir.path(), false));
        let (_, body) = call(app, get("/tessera/status")).await;
        assert_eq!(body["filesPendingDeletion"], 0);
    }
}
