//! Client subsystem: the public request surface.
//!
//! # Data Flow
//! ```text
//! RequestClient::request(endpoint, options)
//!     → RequestState::resolve (API root + endpoint)
//!     → strategy ladder (facade.rs)
//!     → ParsedBody | {error:true,message} | RequestError
//! ```
//!
//! # Design Decisions
//! - One client owns one RequestState; clones share it
//! - Platform seams (transport, bridge host, script loader) are injected
//!   through the builder and default to the native implementations

pub mod facade;
pub mod types;

pub use facade::{RequestAttempt, RequestClient, RequestClientBuilder};
pub use types::{Method, ParsedBody, RequestError, RequestMode, RequestOptions, RequestResult};
