//! Shared state subsystem.
//!
//! # Data Flow
//! ```text
//! RequestClient
//!     → request_state.rs (read use_relay / failure count, record failures)
//!     → relays.rs (hand out next relay, compose relay URL)
//! ```
//!
//! # Design Decisions
//! - State is owned by a client instance, never a process-wide singleton
//! - All mutations are single atomic steps; state only moves forward
//! - Relay rotation has no health awareness

pub mod relays;
pub mod request_state;

pub use relays::{relay_url, RelayRegistry};
pub use request_state::{RequestState, StateSnapshot};
