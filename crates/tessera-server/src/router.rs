use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, SharedBackend};

/// Build the axum router with all Tessera endpoints.
pub fn build_router(backend: SharedBackend) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route(
            "/tessera/configuration",
            get(handler::get_configuration).post(handler::update_configuration),
        )
        .route("/tessera/status", get(handler::status))
        .layer(TraceLayer::new_for_http())
        .with_state(backend)
}
