//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! Strategy builds OutboundRequest
//!     → Transport::send (http.rs: reqwest, per-attempt timeout, CORS check)
//!     → RawResponse
//!     → response.rs (status check, content-type driven decoding)
//!     → ParsedBody
//! ```
//!
//! # Design Decisions
//! - Transport is a trait so strategies can be exercised without a network
//! - Failures carry a structured kind; the message is kept for heuristics
//! - Non-2xx is decided in response.rs, never in the transport

pub mod http;
pub mod response;

use std::collections::BTreeMap;
use std::fmt;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::client::types::{Method, RequestMode};

pub use http::HttpTransport;
pub use response::parse_response;

/// A fully resolved request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub mode: RequestMode,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            mode: RequestMode::Cors,
        }
    }
}

/// Raw response as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Response headers, names lower-cased. Repeated headers are joined
    /// with `, `.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

/// Structured reason for a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The response did not grant access to the calling origin.
    OriginDenied,
    /// DNS, refused connection, TLS failure.
    Connect,
    /// The per-attempt deadline elapsed.
    Timeout,
    /// Anything the transport could not attribute.
    Other,
}

/// A failed transport attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Something that can carry an [`OutboundRequest`] to a remote origin.
pub trait Transport: Send + Sync + fmt::Debug {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>>;
}
