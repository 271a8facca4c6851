//! Shared utilities for integration tests.

use std::time::Duration;

use dev_server::config::ListenerConfig;
use dev_server::net::Listener;
use dev_server::ShutdownPolicy;
use tokio_util::sync::CancellationToken;

/// Bind an ephemeral port on loopback.
pub async fn bind_local() -> Listener {
    let config = ListenerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        max_connections: 64,
    };
    Listener::bind(&config).await.unwrap()
}

/// A client that never reuses connections, so shutdown is not held open by the pool.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Shutdown policy whose escalation is driven by `interrupt` instead of SIGINT.
pub fn policy(interrupt: &CancellationToken) -> ShutdownPolicy {
    ShutdownPolicy::new().with_interrupt(interrupt.clone())
}
