//! Shutdown coordination for the server.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ShutdownConfig;
use crate::lifecycle::signals::{self, Signal, SignalSource};
use crate::lifecycle::{Serve, ServerError};

/// How a graceful shutdown escalates to a forced one.
///
/// The graceful wait runs under a scope that is cancelled by the interrupt
/// source and, when configured, by the grace deadline. Either one aborts the
/// drain.
#[derive(Clone)]
pub struct ShutdownPolicy {
    interrupt: Arc<dyn SignalSource>,
    grace: Option<Duration>,
}

impl ShutdownPolicy {
    /// Escalate on SIGINT, with no deadline on the graceful wait.
    pub fn new() -> Self {
        Self {
            interrupt: Arc::new(Signal::Interrupt),
            grace: None,
        }
    }

    /// Build the policy described by the `[shutdown]` config section.
    pub fn from_config(config: &ShutdownConfig) -> Self {
        let grace = match config.grace_period_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            interrupt: Arc::new(config.force_signal),
            grace,
        }
    }

    /// Replace the source that forces an in-progress shutdown.
    pub fn with_interrupt(mut self, source: impl SignalSource) -> Self {
        self.interrupt = Arc::new(source);
        self
    }

    /// Bound the graceful wait.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = Some(grace);
        self
    }

    /// Configured grace period, if any.
    pub fn grace_period(&self) -> Option<Duration> {
        self.grace
    }

    /// Run the shutdown procedure against `server`.
    ///
    /// The interrupt listener lives exactly as long as this call.
    pub async fn run<S: Serve + ?Sized>(&self, server: &S) -> Result<(), ServerError> {
        let trap = signals::trap(&CancellationToken::new(), Arc::clone(&self.interrupt));

        let deadline = self.grace.map(|grace| {
            let scope = trap.token().clone();
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                scope.cancel();
            })
        });

        tracing::info!(
            grace_period = ?self.grace,
            "Graceful shutdown started"
        );

        let result = server.shutdown(trap.token().clone()).await;

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        match &result {
            Ok(()) => tracing::info!("Graceful shutdown complete"),
            Err(ServerError::ShutdownAborted) if trap.signalled() => {
                tracing::warn!("Interrupt received during graceful shutdown, forced exit")
            }
            Err(ServerError::ShutdownAborted) => {
                tracing::warn!("Grace period elapsed, forced exit")
            }
            Err(e) => tracing::error!(error = %e, "Shutdown failed"),
        }
        result
    }
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownPolicy")
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}
