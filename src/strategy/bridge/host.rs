//! Isolated execution contexts for the bridge strategy.
//!
//! # Responsibilities
//! - Mount a context that performs one request on its own, outside the
//!   caller's transport (no shared connection pool, no `Origin`)
//! - Post the outcome to the bridge inbox, tagged with the request id from
//!   the document
//! - Tear contexts down on request

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use url::Url;

use crate::client::types::{Method, ParsedBody, RequestError, RequestMode};
use crate::strategy::bridge::BridgeInbox;
use crate::transport::{parse_response, HttpTransport, OutboundRequest, Transport};

/// Handle of a mounted context.
pub type ContextId = u64;

/// Everything a context needs to perform its request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDocument {
    pub request_id: String,
    pub url: String,
    pub method: Method,
    pub body: Option<String>,
}

impl BridgeDocument {
    fn outbound(&self) -> OutboundRequest {
        let mut headers = BTreeMap::new();
        if self.body.is_some() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        OutboundRequest {
            method: self.method,
            url: self.url.clone(),
            headers,
            body: self.body.clone(),
            mode: RequestMode::NoCors,
        }
    }
}

/// Message posted from a context back to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeMessage {
    pub request_id: String,
    pub outcome: Result<ParsedBody, String>,
}

/// Platform seam that creates and destroys isolated contexts.
pub trait BridgeHost: Send + Sync + fmt::Debug {
    /// Create a context running `document`; it must post exactly one
    /// [`BridgeMessage`] to `inbox` unless unmounted first.
    fn mount(&self, document: BridgeDocument, inbox: BridgeInbox) -> Result<ContextId, RequestError>;

    /// Destroy a context. Unknown ids are ignored.
    fn unmount(&self, id: ContextId);

    /// Number of contexts currently mounted.
    fn live_contexts(&self) -> usize;
}

/// Runs each context as a tokio task with its own HTTP client.
#[derive(Debug)]
pub struct IsolatedTaskHost {
    timeout: Duration,
    contexts: DashMap<ContextId, JoinHandle<()>>,
    next_id: AtomicU64,
}

impl IsolatedTaskHost {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            contexts: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl BridgeHost for IsolatedTaskHost {
    fn mount(&self, document: BridgeDocument, inbox: BridgeInbox) -> Result<ContextId, RequestError> {
        Url::parse(&document.url)
            .map_err(|e| RequestError::BridgeLoadError(format!("{}: {}", document.url, e)))?;
        let transport = HttpTransport::without_origin(self.timeout)
            .map_err(|e| RequestError::BridgeLoadError(e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(async move {
            let outcome = match transport.send(document.outbound()).await {
                Ok(raw) => parse_response(raw).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            inbox.post(BridgeMessage {
                request_id: document.request_id,
                outcome,
            });
        });
        self.contexts.insert(id, handle);

        tracing::trace!(context = id, "Bridge context mounted");
        Ok(id)
    }

    fn unmount(&self, id: ContextId) {
        if let Some((_, handle)) = self.contexts.remove(&id) {
            handle.abort();
            tracing::trace!(context = id, "Bridge context unmounted");
        }
    }

    fn live_contexts(&self) -> usize {
        self.contexts.len()
    }
}
