//! Publish/subscribe bus for live-reload notifications.
//!
//! # Data Flow
//! ```text
//! Build pipeline / file watcher
//!     → Bus::publish(topic, payload)
//!     → every Subscription (one per live-reload client)
//!     → http::handler streams it as a server-sent event
//! ```
//!
//! # Design Decisions
//! - Fan-out over a bounded broadcast channel; slow subscribers skip ahead
//! - Publishing never blocks and never fails when nobody listens

pub mod bus;

pub use bus::{Bus, Event, Subscription};
