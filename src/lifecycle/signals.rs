//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT/SIGTERM (Ctrl+C on non-unix targets)
//! - Layer a signal on top of a cancellation token ([`trap`])
//! - Release the signal listener as soon as the trap is dropped
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A trap fires at most once; the first signal wins
//! - Signal sources are a trait so tests can simulate an interrupt

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Process signals the server reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// SIGINT (Ctrl+C).
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Interrupt => write!(f, "SIGINT"),
            Signal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Something that can deliver a one-shot notification.
pub trait SignalSource: Send + Sync + 'static {
    /// Resolves when the signal arrives, or fails if it cannot be observed.
    fn recv(&self) -> BoxFuture<'static, io::Result<()>>;
}

impl SignalSource for Signal {
    fn recv(&self) -> BoxFuture<'static, io::Result<()>> {
        Box::pin(wait_for(*self))
    }
}

/// A token doubles as a simulated signal: cancelling it delivers the signal.
impl SignalSource for CancellationToken {
    fn recv(&self) -> BoxFuture<'static, io::Result<()>> {
        let token = self.clone();
        Box::pin(async move {
            token.cancelled().await;
            Ok(())
        })
    }
}

#[cfg(unix)]
async fn wait_for(signal: Signal) -> io::Result<()> {
    use tokio::signal::unix::{self, SignalKind};

    let kind = match signal {
        Signal::Interrupt => SignalKind::interrupt(),
        Signal::Terminate => SignalKind::terminate(),
    };
    let mut stream = unix::signal(kind)?;
    match stream.recv().await {
        Some(()) => Ok(()),
        None => Err(io::Error::other(format!("{signal} stream closed"))),
    }
}

#[cfg(not(unix))]
async fn wait_for(_signal: Signal) -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// A cancellation token that also fires when a signal arrives.
///
/// The listener task is aborted on drop, so the signal registration never
/// outlives the trap.
#[derive(Debug)]
pub struct Trap {
    token: CancellationToken,
    signalled: Arc<AtomicBool>,
    listener: JoinHandle<()>,
}

impl Trap {
    /// The derived token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the token was cancelled by the signal rather than the parent.
    pub fn signalled(&self) -> bool {
        self.signalled.load(Ordering::SeqCst)
    }
}

impl Drop for Trap {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Derive a token from `parent` that is also cancelled by the first signal
/// delivered through `source`.
///
/// # Panics
///
/// Panics when called outside a Tokio runtime.
pub fn trap(parent: &CancellationToken, source: Arc<dyn SignalSource>) -> Trap {
    let token = parent.child_token();
    let signalled = Arc::new(AtomicBool::new(false));

    let listener = tokio::spawn({
        let token = token.clone();
        let signalled = Arc::clone(&signalled);
        async move {
            tokio::select! {
                _ = token.cancelled() => {}
                received = source.recv() => match received {
                    Ok(()) => {
                        signalled.store(true, Ordering::SeqCst);
                        tracing::info!("Signal received, cancelling trapped scope");
                        token.cancel();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to install signal handler");
                    }
                },
            }
        }
    });

    Trap {
        token,
        signalled,
        listener,
    }
}
