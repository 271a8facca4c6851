//! HTTP server primitive.
//!
//! # Responsibilities
//! - Own the listener until serving starts
//! - Run `axum::serve` with graceful shutdown tied to a stop token
//! - Report deliberate closure as `ServerError::ServerClosed`
//! - Abort the serve loop when a shutdown is forced

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use futures_util::future::BoxFuture;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::{Serve, ServerError};
use crate::net::Listener;

/// HTTP server serving one router on one listener.
///
/// Once shut down it stays shut down; a later `serve` returns
/// [`ServerError::ServerClosed`] immediately.
#[derive(Clone)]
pub struct HttpServer {
    inner: Arc<Inner>,
}

struct Inner {
    listener: Mutex<Option<Listener>>,
    router: Router,
    /// Cancelled when shutdown begins: stop accepting, start draining.
    stop: CancellationToken,
    /// Cancelled when the spawned serve loop has returned or been aborted.
    drained: CancellationToken,
    running: Mutex<Option<AbortHandle>>,
}

impl HttpServer {
    /// Create a server for `router` on an already-bound listener.
    pub fn new(listener: Listener, router: Router) -> Self {
        Self {
            inner: Arc::new(Inner {
                listener: Mutex::new(Some(listener)),
                router,
                stop: CancellationToken::new(),
                drained: CancellationToken::new(),
                running: Mutex::new(None),
            }),
        }
    }
}

impl Serve for HttpServer {
    fn serve(&self) -> BoxFuture<'static, ServerError> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.serve().await })
    }

    fn shutdown(&self, scope: CancellationToken) -> BoxFuture<'static, Result<(), ServerError>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.shutdown(scope).await })
    }
}

impl Inner {
    async fn serve(&self) -> ServerError {
        let Some(listener) = lock(&self.listener).take() else {
            return ServerError::ServerClosed;
        };
        if self.stop.is_cancelled() {
            self.drained.cancel();
            return ServerError::ServerClosed;
        }

        let address = listener.address();
        let signal = self.stop.clone().cancelled_owned();
        let drained = self.drained.clone();
        let app = self.router.clone();
        // The guard fires on return and on abort, whoever awaits the task.
        let task = tokio::spawn(async move {
            let _drained = drained.drop_guard();
            axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
        });
        *lock(&self.running) = Some(task.abort_handle());

        tracing::info!(address = %address, "HTTP server accepting connections");

        let outcome = task.await;
        lock(&self.running).take();

        match outcome {
            // axum only returns once the stop token has fired.
            Ok(Ok(())) => ServerError::ServerClosed,
            Ok(Err(e)) => ServerError::Serve(e),
            Err(e) if e.is_cancelled() => ServerError::ServerClosed,
            Err(e) => ServerError::TaskFailed(e.to_string()),
        }
    }

    async fn shutdown(&self, scope: CancellationToken) -> Result<(), ServerError> {
        self.stop.cancel();

        let unserved = lock(&self.listener).take();
        if let Some(listener) = unserved {
            tracing::debug!(address = %listener.address(), "Closing listener that never served");
            self.drained.cancel();
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = self.drained.cancelled() => Ok(()),
            _ = scope.cancelled() => {
                let serving = lock(&self.running).take();
                if let Some(serving) = serving {
                    serving.abort();
                }
                Err(ServerError::ShutdownAborted)
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
