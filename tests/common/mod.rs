//! Shared utilities for integration tests.

use std::net::SocketAddr;

use axum::Router;
use request_timeout::config::AppConfig;
use request_timeout::{HttpServer, Shutdown};
use tokio::net::TcpListener;

/// Config whose global policy expires after `timeout_seconds`.
pub fn config_with_timeout(timeout_seconds: f64) -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.timeouts.timeout_seconds = timeout_seconds;
    config
}

/// Serve `routes` on an ephemeral port. Keep the returned [`Shutdown`] alive
/// for as long as the server should run.
pub async fn spawn_server(config: AppConfig, routes: Router) -> (SocketAddr, Shutdown) {
    let server = HttpServer::with_routes(config, routes).unwrap();
    spawn(server).await
}

/// Serve the demonstration endpoints on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_demo_server(config: AppConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    spawn(server).await
}

async fn spawn(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Client without pooling or proxies, so every request opens its own connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
