//! HTTP server implementation for reverse proxy deployment
//!
//! TLS termination and compression are left to the reverse proxy in front of
//! the service; `X-Forwarded-For` names the client only when listed in
//! `server.trusted_proxy_headers`.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, instrument};
use warp::{Filter, Reply};

use crate::application::services::checkout_service::CheckoutCoordinator;
use crate::config::AppConfig;
use crate::infrastructure::http::routes::RouteBuilder;
use crate::shared::error::{AppError, AppResult};

/// HTTP server hosting the checkout endpoints
pub struct HttpServer {
    config: AppConfig,
    coordinator: Arc<CheckoutCoordinator>,
}

impl HttpServer {
    pub fn new(config: AppConfig, coordinator: Arc<CheckoutCoordinator>) -> Self {
        Self { config, coordinator }
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Create the application routes
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone {
        RouteBuilder::build_routes(&self.config, self.coordinator.clone())
    }

    /// Serve until `shutdown` resolves
    #[instrument(skip(self, shutdown))]
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()> + Send + 'static) -> AppResult<()> {
        let addr: SocketAddr = self
            .config
            .server_address()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid server address: {}", e)))?;

        info!(%addr, available = self.coordinator.is_available(), "Starting checkout HTTP server");
        tokio::select! {
            _ = warp::serve(self.routes()).run(addr) => {}
            _ = shutdown => info!("Shutdown signal received"),
        }
        self.coordinator.scheduler().shutdown().await;
        info!("Checkout HTTP server stopped");

        Ok(())
    }
}
