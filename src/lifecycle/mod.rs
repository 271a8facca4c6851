//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Bind listener → Build handler → Server::listen
//!
//! Serving (coordinator.rs, group.rs):
//!     start(ctx) → TaskGroup { serve task, shutdown watcher }
//!     ctx cancelled or serve error → watcher runs the shutdown procedure
//!     supervisor → join both tasks → drop the "server closed" sentinel
//!     wait() → await the supervisor's published outcome (any number of callers)
//!
//! Shutdown (shutdown.rs):
//!     Stop accepting → Drain in-flight requests
//!     Interrupt or grace deadline during the drain → abort immediately
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → cancel a trapped scope (one shot)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listener, then handler
//! - One join point reduces both task outcomes; the sentinel is filtered there
//! - Signal listeners are registered per shutdown call and released after it

pub mod coordinator;
pub mod error;
pub mod group;
pub mod shutdown;
pub mod signals;
pub mod startup;

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

pub use coordinator::{Phase, Server};
pub use error::ServerError;
pub use group::TaskGroup;
pub use shutdown::ShutdownPolicy;
pub use signals::{trap, Signal, SignalSource, Trap};

/// The server primitive driven by the coordinator.
///
/// Implementations own the listener and translate their own notion of
/// "closed on purpose" into [`ServerError::ServerClosed`].
pub trait Serve: Send + Sync + 'static {
    /// Run the accept/dispatch loop until it stops.
    ///
    /// The loop never ends successfully: after an orderly shutdown it yields
    /// [`ServerError::ServerClosed`].
    fn serve(&self) -> BoxFuture<'static, ServerError>;

    /// Stop accepting and wait for in-flight requests to drain.
    ///
    /// If `scope` is cancelled before draining finishes, the loop is aborted
    /// and [`ServerError::ShutdownAborted`] is returned. Calling this more
    /// than once must be harmless.
    fn shutdown(&self, scope: CancellationToken) -> BoxFuture<'static, Result<(), ServerError>>;
}
