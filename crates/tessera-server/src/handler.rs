use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::backend::{StatusReport, StorageBackend};
use crate::config::{ConfigurationUpdate, StorageSettings};
use crate::error::{ServerError, ServerResult};

pub type SharedBackend = Arc<StorageBackend>;

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Effective storage settings.
pub async fn get_configuration(State(backend): State<SharedBackend>) -> Json<StorageSettings> {
    Json(backend.configuration())
}

/// Apply the hot-reloadable subset of a configuration document.
///
/// Body rejections are reported as [`ServerError::Config`] so every failure
/// carries the same JSON error shape.
pub async fn update_configuration(
    State(backend): State<SharedBackend>,
    body: Result<Json<ConfigurationUpdate>, JsonRejection>,
) -> ServerResult<Json<StorageSettings>> {
    let Json(update) = body.map_err(|rejection| ServerError::Config(rejection.body_text()))?;
    let settings = backend.update_configuration(&update)?;
    Ok(Json(settings))
}

pub async fn status(State(backend): State<SharedBackend>) -> ServerResult<Json<StatusReport>> {
    // Counting goes through SQLite, which blocks.
    let report = tokio::task::spawn_blocking(move || backend.status())
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok(Json(report))
}
