//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections for `axum::serve`
//! - Enforce max_connections limit via semaphore
//! - Graceful handling of accept errors

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::ListenerConfig;
use crate::net::connection::Connection;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// The bound socket could not report its address.
    #[error("failed to read local address: {0}")]
    Address(#[source] std::io::Error),
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
#[derive(Debug)]
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Address resolved once at bind time.
    local_addr: SocketAddr,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    /// Configured maximum connections.
    max_connections: usize,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(&config.bind_address)
            .await
            .map_err(|source| ListenerError::Bind {
                address: config.bind_address.clone(),
                source,
            })?;
        Self::from_tcp(listener, config.max_connections)
    }

    /// Wrap a socket that is already bound.
    pub fn from_tcp(listener: TcpListener, max_connections: usize) -> Result<Self, ListenerError> {
        let local_addr = listener.local_addr().map_err(ListenerError::Address)?;

        tracing::info!(
            address = %local_addr,
            max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            local_addr,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The bound address rendered as `host:port`.
    pub fn address(&self) -> String {
        self.local_addr.to_string()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

impl axum::serve::Listener for Listener {
    type Io = Connection;
    type Addr = SocketAddr;

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Waits while the limit is reached. Accept errors are logged and retried.
    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        // Acquire permit first (backpressure)
        let permit = Arc::clone(&self.connection_limit)
            .acquire_owned()
            .await
            .expect("connection semaphore is never closed");

        loop {
            match self.inner.accept().await {
                Ok((stream, peer_addr)) => {
                    let connection = Connection::new(stream, permit);
                    tracing::debug!(
                        peer_addr = %peer_addr,
                        connection_id = %connection.id(),
                        available_permits = self.connection_limit.available_permits(),
                        "Connection accepted"
                    );
                    return (connection, peer_addr);
                }
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "Peer dropped before accept completed");
                }
                Err(e) => {
                    // Likely fd exhaustion; back off instead of spinning.
                    tracing::error!(error = %e, "Accept failed, retrying in 1s");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}

fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::serve::Listener as _;

    fn local_config(max_connections: usize) -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            max_connections,
        }
    }

    #[tokio::test]
    async fn bind_reports_ephemeral_port() {
        let listener = Listener::bind(&local_config(4)).await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
        assert_eq!(listener.address(), listener.local_addr().to_string());
        assert_eq!(listener.max_connections(), 4);
    }

    #[tokio::test]
    async fn bind_failure_names_the_address() {
        let taken = Listener::bind(&local_config(1)).await.unwrap();
        let config = ListenerConfig {
            bind_address: taken.address(),
            max_connections: 1,
        };

        let err = Listener::bind(&config).await.unwrap_err();
        assert!(err.to_string().contains(&taken.address()));
    }

    #[tokio::test]
    async fn permit_is_held_for_connection_lifetime() {
        let mut listener = Listener::bind(&local_config(2)).await.unwrap();
        let addr = listener.local_addr();

        let _client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (connection, _) = listener.accept().await;
        assert_eq!(listener.available_permits(), 1);

        drop(connection);
        assert_eq!(listener.available_permits(), 2);
    }
}
