//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Strategy attempt:
//!     → timeouts.rs (enforce the strategy's deadline)
//!     → On failure: classifier.rs (cross-origin / unreachable / http status)
//!     → RequestClient decides the next rung of the escalation ladder
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every strategy has a deadline
//! - Classification is isolated behind a trait so it can be swapped per platform
//! - Escalation decisions are made only by the client facade

pub mod classifier;
pub mod timeouts;

pub use classifier::{Classification, ErrorClassifier, HeuristicClassifier, StructuredClassifier};
pub use timeouts::StrategyTimeouts;
