//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Strategies and the client facade produce:
//!     → tracing events (attempts, classification, escalation, state flips)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr) in the CLI
//!     → whatever metrics recorder the host application installs
//! ```

pub mod logging;
pub mod metrics;
