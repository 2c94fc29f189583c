//! Per-client request state.
//!
//! # State Transitions
//! ```text
//! use_relay: false → true once cross_origin_failures reaches max_retries
//!            true  → (never) no automatic reset
//! cross_origin_failures: monotonic, never reset for the client's lifetime
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::config::Environment;

/// Shared mutable state driving strategy selection.
///
/// Owned by one `RequestClient` and shared by its clones. Every field is
/// updated with a single atomic step so concurrent callers can only ever
/// move the state forward.
#[derive(Debug)]
pub struct RequestState {
    api_root: String,
    relay_root: ArcSwap<String>,
    environment: Environment,
    use_relay: AtomicBool,
    cross_origin_failures: AtomicU32,
    max_retries: u32,
}

/// Point-in-time copy of [`RequestState`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub api_root: String,
    pub relay_root: String,
    pub environment: Environment,
    pub use_relay: bool,
    pub cross_origin_failures: u32,
    pub max_retries: u32,
}

impl RequestState {
    pub fn new(
        api_root: impl Into<String>,
        relay_root: impl Into<String>,
        environment: Environment,
        max_retries: u32,
    ) -> Self {
        Self {
            api_root: api_root.into().trim_end_matches('/').to_string(),
            relay_root: ArcSwap::from_pointee(relay_root.into()),
            environment,
            use_relay: AtomicBool::new(false),
            cross_origin_failures: AtomicU32::new(0),
            max_retries,
        }
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn relay_root(&self) -> Arc<String> {
        self.relay_root.load_full()
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn use_relay(&self) -> bool {
        self.use_relay.load(Ordering::Acquire)
    }

    pub fn cross_origin_failures(&self) -> u32 {
        self.cross_origin_failures.load(Ordering::Acquire)
    }

    /// True once direct and relay attempts are abandoned for the session.
    pub fn threshold_exceeded(&self) -> bool {
        self.cross_origin_failures() > self.max_retries
    }

    /// Resolve an endpoint against the API root.
    ///
    /// Absolute endpoints are passed through untouched.
    pub fn resolve(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        if endpoint.is_empty() {
            return self.api_root.clone();
        }
        if endpoint.starts_with('/') {
            format!("{}{}", self.api_root, endpoint)
        } else {
            format!("{}/{}", self.api_root, endpoint)
        }
    }

    /// Record one cross-origin failure and return the new count.
    ///
    /// Flips `use_relay` permanently once the count reaches `max_retries`.
    pub fn record_cross_origin_failure(&self) -> u32 {
        let count = self.cross_origin_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if count >= self.max_retries && !self.use_relay.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                failures = count,
                max_retries = self.max_retries,
                "Direct access considered broken, routing through relays for this session"
            );
        }
        count
    }

    /// Switch the active relay root.
    pub fn set_relay_root(&self, relay_root: String) {
        self.relay_root.store(Arc::new(relay_root));
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            api_root: self.api_root.clone(),
            relay_root: self.relay_root().as_ref().clone(),
            environment: self.environment,
            use_relay: self.use_relay(),
            cross_origin_failures: self.cross_origin_failures(),
            max_retries: self.max_retries,
        }
    }
}
