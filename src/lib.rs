//! Resilient request layer.
//!
//! Issues HTTP requests against a configured API and, when the remote
//! refuses cross-origin access or is unreachable, escalates through
//! progressively more indirect strategies: direct call, rotating relay,
//! isolated-context bridge and finally script-injection callback.

pub mod client;
pub mod config;
pub mod observability;
pub mod resilience;
pub mod state;
pub mod strategy;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{Method, ParsedBody, RequestClient, RequestError, RequestOptions};
pub use config::schema::ClientConfig;
pub use state::{RelayRegistry, RequestState};
