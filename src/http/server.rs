//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the demonstration handlers (or caller-supplied routes)
//! - Wire up middleware (request ID, tracing, global timeout)
//! - Bind server to listener
//! - Shut down gracefully on signal or on request

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::handlers::demo_routes;
use crate::http::middleware::RequestTimeoutLayer;
use crate::lifecycle::shutdown_signal;
use crate::resilience::policy::{PolicyError, TimeoutPolicy};

/// HTTP server enforcing the configured global timeout.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a server exposing the demonstration endpoints.
    pub fn new(config: AppConfig) -> Result<Self, PolicyError> {
        Self::with_routes(config, demo_routes()?)
    }

    /// Create a server around caller-supplied routes.
    ///
    /// Fails if the configured global policy is invalid; nothing is served in that case.
    pub fn with_routes(config: AppConfig, routes: Router) -> Result<Self, PolicyError> {
        let global = config.timeouts.to_policy()?;
        tracing::info!(
            timeout_ms = global.duration().as_millis() as u64,
            status = global.status().as_u16(),
            "Global timeout policy registered"
        );

        let router = Self::build_router(routes, global);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(routes: Router, global: TimeoutPolicy) -> Router {
        routes
            .layer(RequestTimeoutLayer::new(global))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Router with every layer applied, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires or the process is signalled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => tracing::info!("Shutdown requested"),
                    () = shutdown_signal() => {}
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
