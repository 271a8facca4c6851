//! Errors produced while serving and shutting down.

use std::io;

use thiserror::Error;

/// Outcome of a failed serve or shutdown step.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The serve loop stopped because the server was deliberately closed.
    ///
    /// This is the expected result of every orderly shutdown and is never
    /// reported to callers of [`Server::wait`](crate::lifecycle::Server::wait).
    #[error("server closed")]
    ServerClosed,

    /// The accept/dispatch loop failed.
    #[error("serve failed: {0}")]
    Serve(#[source] io::Error),

    /// The server primitive could not complete its shutdown.
    #[error("shutdown failed: {0}")]
    Shutdown(#[source] io::Error),

    /// The graceful shutdown was cut short before in-flight requests drained.
    #[error("graceful shutdown aborted before connections drained")]
    ShutdownAborted,

    /// A coordinator task panicked or was cancelled from outside.
    #[error("server task failed: {0}")]
    TaskFailed(String),
}

impl ServerError {
    /// Whether this error only signals a deliberate closure.
    ///
    /// Server primitives translate their own "listener closed" condition into
    /// [`ServerError::ServerClosed`], so this is the single predicate the
    /// coordinator consults.
    pub fn is_expected_closure(&self) -> bool {
        matches!(self, ServerError::ServerClosed)
    }
}

/// Every waiter on a server receives its own copy of the outcome. I/O errors
/// are rebuilt from their kind and message.
impl Clone for ServerError {
    fn clone(&self) -> Self {
        match self {
            Self::ServerClosed => Self::ServerClosed,
            Self::Serve(e) => Self::Serve(io::Error::new(e.kind(), e.to_string())),
            Self::Shutdown(e) => Self::Shutdown(io::Error::new(e.kind(), e.to_string())),
            Self::ShutdownAborted => Self::ShutdownAborted,
            Self::TaskFailed(message) => Self::TaskFailed(message.clone()),
        }
    }
}
