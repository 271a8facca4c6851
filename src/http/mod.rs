//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection (net::Connection)
//!     → server.rs (axum::serve, graceful drain, forced abort)
//!     → handler.rs (request ID, timeout, trace layers)
//!     → static file from the root, or the live-reload event stream
//! ```

pub mod handler;
pub mod server;

pub use server::HttpServer;
