//! Metrics collection.
//!
//! # Metrics
//! - `fetch_attempts_total` (counter): attempts by strategy, outcome
//! - `fetch_escalations_total` (counter): ladder steps by from, to
//! - `fetch_cross_origin_failures` (gauge): session failure count
//! - `fetch_bridge_pending` (gauge): bridge calls awaiting a message
//!
//! # Design Decisions
//! - The library only records; installing an exporter is the host's job
//! - Without a recorder installed every call is a no-op

use metrics::{counter, gauge};

/// Record the outcome of one strategy attempt.
pub fn record_attempt(strategy: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("fetch_attempts_total", "strategy" => strategy, "outcome" => outcome).increment(1);
}

/// Record a step up the escalation ladder.
pub fn record_escalation(from: &'static str, to: &'static str) {
    counter!("fetch_escalations_total", "from" => from, "to" => to).increment(1);
}

pub fn record_cross_origin_failures(count: u32) {
    gauge!("fetch_cross_origin_failures").set(count as f64);
}

pub fn record_bridge_pending(count: usize) {
    gauge!("fetch_bridge_pending").set(count as f64);
}
