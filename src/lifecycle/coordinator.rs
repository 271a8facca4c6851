//! Server lifecycle coordinator.
//!
//! # Responsibilities
//! - Own the listener (through the server primitive) and the handler
//! - Run the serve loop and the shutdown watcher as one task group
//! - Reduce both outcomes to a single result, hiding deliberate closure
//!
//! # States
//! ```text
//! Idle --start--> Running --ctx cancelled / serve error--> ShuttingDown --tasks joined--> Closed
//! Idle --close--> ShuttingDown --close returns--> Closed
//! ```
//!
//! A supervisor task owns the group and publishes the reduced outcome once.
//! Any number of callers may wait on it, and dropping a wait leaves the
//! tasks running.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::http::HttpServer;
use crate::lifecycle::{Serve, ServerError, ShutdownPolicy, TaskGroup};
use crate::net::Listener;

/// Lifecycle phase of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, not serving yet.
    Idle,
    /// Serving requests.
    Running,
    /// Shutdown has been requested; tasks are winding down.
    ShuttingDown,
    /// Both tasks have finished. Terminal.
    Closed,
}

type Outcome = Option<Result<(), ServerError>>;

#[derive(Debug)]
struct Lifecycle {
    phase: Phase,
    /// Set once started; holds `Some` after both tasks have finished.
    outcome: Option<watch::Receiver<Outcome>>,
}

impl Lifecycle {
    fn begin_shutdown(&mut self) {
        if matches!(self.phase, Phase::Idle | Phase::Running) {
            self.phase = Phase::ShuttingDown;
        }
    }
}

/// Coordinates the start/stop lifecycle of one server primitive.
pub struct Server<S: Serve = HttpServer> {
    address: String,
    server: Arc<S>,
    shutdown: Arc<ShutdownPolicy>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl Server<HttpServer> {
    /// Bind `handler` to an already-bound listener. Performs no I/O.
    pub fn new(listener: Listener, handler: Router) -> Self {
        let address = listener.address();
        Self::from_parts(address, HttpServer::new(listener, handler))
    }
}

impl<S: Serve> Server<S> {
    /// Coordinate any server primitive listening on `address`.
    pub fn from_parts(address: impl Into<String>, server: S) -> Self {
        Self {
            address: address.into(),
            server: Arc::new(server),
            shutdown: Arc::new(ShutdownPolicy::default()),
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                phase: Phase::Idle,
                outcome: None,
            })),
        }
    }

    /// Replace the shutdown escalation policy.
    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown = Arc::new(policy);
        self
    }

    /// The listener's address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Begin serving in the background.
    ///
    /// Cancelling `ctx` starts a graceful shutdown. Failures surface through
    /// [`Server::wait`]. Only an idle server can be started; other calls are
    /// ignored.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start(&self, ctx: &CancellationToken) {
        let mut lifecycle = self.lock();
        if lifecycle.phase != Phase::Idle {
            tracing::warn!(
                address = %self.address,
                phase = ?lifecycle.phase,
                "Server already started, ignoring start"
            );
            return;
        }

        let mut group = TaskGroup::new(ctx);

        let server = Arc::clone(&self.server);
        let shutdown = Arc::clone(&self.shutdown);
        let state = Arc::clone(&self.lifecycle);
        group.spawn(move |scope| async move {
            scope.cancelled().await;
            lock(&state).begin_shutdown();
            shutdown.run(&*server).await
        });

        let server = Arc::clone(&self.server);
        group.spawn(move |_| async move { Err(server.serve().await) });

        let (report, outcome) = watch::channel(None);
        let state = Arc::clone(&self.lifecycle);
        let address = self.address.clone();
        tokio::spawn(async move {
            let result = reduce(&address, group.join().await);
            lock(&state).phase = Phase::Closed;
            report.send_replace(Some(result));
        });

        lifecycle.phase = Phase::Running;
        lifecycle.outcome = Some(outcome);
        tracing::info!(address = %self.address, "Server started");
    }

    /// Block until the serve loop and the shutdown watcher have both finished.
    ///
    /// Returns the first error that is not a deliberate closure. Returns
    /// immediately when nothing was started. Safe to call concurrently and to
    /// cancel.
    pub async fn wait(&self) -> Result<(), ServerError> {
        let outcome = self.lock().outcome.clone();
        let Some(mut outcome) = outcome else {
            let mut lifecycle = self.lock();
            if lifecycle.phase == Phase::ShuttingDown {
                lifecycle.phase = Phase::Closed;
            }
            return Ok(());
        };

        let finished = outcome
            .wait_for(Option::is_some)
            .await
            .map(|result| result.clone());
        match finished {
            Ok(Some(result)) => result,
            _ => Err(ServerError::TaskFailed(
                "server supervisor exited without a result".to_string(),
            )),
        }
    }

    /// Serve until `ctx` is cancelled and the shutdown completes.
    pub async fn listen(&self, ctx: &CancellationToken) -> Result<(), ServerError> {
        self.start(ctx);
        self.wait().await
    }

    /// Shut down now and wait for the tasks to finish.
    ///
    /// Closing a closed server is a no-op.
    pub async fn close(&self) -> Result<(), ServerError> {
        {
            let mut lifecycle = self.lock();
            if lifecycle.phase == Phase::Closed {
                return Ok(());
            }
            lifecycle.begin_shutdown();
        }

        tracing::info!(address = %self.address, "Closing server");
        let shutdown = self.shutdown.run(&*self.server).await;
        let waited = self.wait().await;
        shutdown.and(waited)
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        lock(&self.lifecycle)
    }
}

/// Pick the first error that is not a deliberate closure.
fn reduce(address: &str, errors: Vec<ServerError>) -> Result<(), ServerError> {
    match errors.into_iter().find(|e| !e.is_expected_closure()) {
        Some(e) => {
            tracing::error!(address = %address, error = %e, "Server stopped with error");
            Err(e)
        }
        None => {
            tracing::info!(address = %address, "Server stopped");
            Ok(())
        }
    }
}

fn lock(lifecycle: &Mutex<Lifecycle>) -> MutexGuard<'_, Lifecycle> {
    lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
}
