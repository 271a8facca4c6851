//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener and build the handler from validated config
//! - Trap process signals onto the serving context
//! - Serve until shutdown completes
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds right before serving begins
//! - First signal starts a graceful shutdown; the shutdown traps its own

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::http::handler;
use crate::lifecycle::signals::{self, Signal};
use crate::lifecycle::{Server, ServerError, ShutdownPolicy};
use crate::net::{Listener, ListenerError};
use crate::pubsub::Bus;

/// Errors that end the process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Bind, serve, and return once the server has shut down.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    let listener = Listener::bind(&config.listener).await?;
    let bus = Bus::default();
    let router = handler::build(&config.handler, bus);

    let server = Server::new(listener, router)
        .with_shutdown_policy(ShutdownPolicy::from_config(&config.shutdown));

    tracing::info!(
        address = %server.address(),
        root = %config.handler.root.display(),
        live_reload = config.handler.live_reload,
        "Serving"
    );

    let root = CancellationToken::new();
    let interrupt = signals::trap(&root, Arc::new(Signal::Interrupt));
    let terminate = signals::trap(interrupt.token(), Arc::new(Signal::Terminate));

    server.listen(terminate.token()).await?;
    Ok(())
}
