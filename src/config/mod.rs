//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, RESILIENT_FETCH_ENV override)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → RequestClient::from_config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; runtime state lives in RequestState
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ClientConfig;
pub use schema::Environment;
pub use schema::RelayConfig;
pub use schema::TimeoutConfig;
