use std::future::Future;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::SharedBackend;
use crate::router::build_router;

/// HTTP front of a [`StorageBackend`](crate::StorageBackend).
pub struct TesseraServer {
    config: ServerConfig,
    backend: SharedBackend,
}

impl TesseraServer {
    pub fn new(config: ServerConfig, backend: SharedBackend) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.backend.clone())
    }

    /// Serve until `shutdown` resolves.
    ///
    /// The deletion worker is started before the listener accepts requests
    /// and stopped once the server has drained.
    pub async fn serve<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.backend.start()?;
        tracing::info!(addr = %self.config.bind_addr, "Tessera server listening");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.stop())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("Tessera server stopped");
        served
    }
}
