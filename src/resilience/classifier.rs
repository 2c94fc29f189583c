//! Failure classification.
//!
//! # Classes
//! - CrossOriginDenied: the runtime refused to expose a cross-origin response
//! - NetworkUnreachable: DNS, offline, refused connection, timeout
//! - HttpStatus(code): transport succeeded, remote answered non-2xx
//!
//! # Design Decisions
//! - Browsers expose no structured reason for cross-origin refusals, so the
//!   heuristic matches known phrases case-insensitively
//! - The structured classifier trusts the transport's error kind and only
//!   falls back to the heuristic for unattributed failures

use std::fmt;

use crate::client::types::RequestError;
use crate::transport::TransportErrorKind;

/// Outcome of classifying a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    CrossOriginDenied,
    NetworkUnreachable,
    HttpStatus(u16),
}

impl Classification {
    /// Cross-origin denial and unreachable networks escalate the same way.
    pub fn escalates(&self) -> bool {
        matches!(self, Classification::CrossOriginDenied | Classification::NetworkUnreachable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::CrossOriginDenied => "cross_origin_denied",
            Classification::NetworkUnreachable => "network_unreachable",
            Classification::HttpStatus(_) => "http_status",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::HttpStatus(code) => write!(f, "http_status({})", code),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Labels a failed attempt.
pub trait ErrorClassifier: Send + Sync + fmt::Debug {
    fn classify(&self, error: &RequestError) -> Classification;
}

/// Phrases browsers and relays use when refusing cross-origin access.
pub const CROSS_ORIGIN_PHRASES: &[&str] = &[
    "cors",
    "cross-origin",
    "cross origin",
    "access-control-allow-origin",
    "failed to fetch",
    "networkerror when attempting to fetch",
    "load failed",
    "blocked by",
];

/// Substring matcher over the error's textual description.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn matches_cross_origin(text: &str) -> bool {
        let lower = text.to_lowercase();
        CROSS_ORIGIN_PHRASES.iter().any(|phrase| lower.contains(phrase))
    }
}

impl ErrorClassifier for HeuristicClassifier {
    fn classify(&self, error: &RequestError) -> Classification {
        if let Some(status) = error.status() {
            return Classification::HttpStatus(status);
        }
        if Self::matches_cross_origin(&error.to_string()) {
            Classification::CrossOriginDenied
        } else {
            Classification::NetworkUnreachable
        }
    }
}

/// Uses the transport's structured error kind, falling back to the heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredClassifier {
    fallback: HeuristicClassifier,
}

impl ErrorClassifier for StructuredClassifier {
    fn classify(&self, error: &RequestError) -> Classification {
        match error {
            RequestError::Transport(e) => match e.kind {
                TransportErrorKind::OriginDenied => Classification::CrossOriginDenied,
                TransportErrorKind::Connect | TransportErrorKind::Timeout => {
                    Classification::NetworkUnreachable
                }
                TransportErrorKind::Other => self.fallback.classify(error),
            },
            other => self.fallback.classify(other),
        }
    }
}
