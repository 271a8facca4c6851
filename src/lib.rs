//! Development HTTP server with an orderly start/stop lifecycle.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pubsub;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{Server, ServerError, ShutdownPolicy};
