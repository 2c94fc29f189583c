//! Bridge strategy: perform the request inside an isolated context and
//! recover the result over a message channel.
//!
//! # Data Flow
//! ```text
//! run(url, method, body)
//!     → random request id, pending entry (with reply slot) inserted
//!     → BridgeHost::mount(document{id, url, method, body}, inbox)
//!     → context posts BridgeMessage to the inbox
//!     → inbox removes the pending entry for that id and fills its reply slot
//!       (messages for unknown ids are dropped)
//!     → settle once: success | BridgeRemote | BridgeTimeout | BridgeLoadError
//!     → guard drop: pending entry removed, context unmounted
//! ```
//!
//! # Design Decisions
//! - Delivery is keyed by request id, never buffered: any number of calls
//!   may be in flight without a reply being lost

pub mod host;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::oneshot;

use crate::client::types::{Method, ParsedBody, RequestError, RequestResult};
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;

pub use host::{BridgeDocument, BridgeHost, BridgeMessage, ContextId, IsolatedTaskHost};

const REQUEST_ID_LEN: usize = 12;

/// What a context reports: the parsed body or a description of the failure.
pub type BridgeOutcome = Result<ParsedBody, String>;

/// A bridge call awaiting its message.
#[derive(Debug)]
pub struct PendingBridgeRequest {
    pub id: String,
    pub context: Option<ContextId>,
    pub issued_at: Instant,
    pub deadline: Instant,
    reply: oneshot::Sender<BridgeOutcome>,
}

/// Routes context messages to the call awaiting them.
///
/// Clones share the same pending table.
#[derive(Debug, Clone, Default)]
pub struct BridgeInbox {
    pending: Arc<DashMap<String, PendingBridgeRequest>>,
}

impl BridgeInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a reply slot for `id`.
    pub(crate) fn register(&self, id: &str, timeout: Duration) -> oneshot::Receiver<BridgeOutcome> {
        let (reply, replied) = oneshot::channel();
        let issued_at = Instant::now();
        self.pending.insert(
            id.to_string(),
            PendingBridgeRequest {
                id: id.to_string(),
                context: None,
                issued_at,
                deadline: issued_at + timeout,
                reply,
            },
        );
        replied
    }

    fn attach(&self, id: &str, context: ContextId) {
        if let Some(mut entry) = self.pending.get_mut(id) {
            entry.context = Some(context);
        }
    }

    fn cancel(&self, id: &str) {
        self.pending.remove(id);
    }

    /// Deliver a context's message. Returns false when no call is waiting
    /// for its request id.
    pub fn post(&self, message: BridgeMessage) -> bool {
        match self.pending.remove(&message.request_id) {
            Some((_, entry)) => entry.reply.send(message.outcome).is_ok(),
            None => {
                tracing::trace!(request_id = %message.request_id, "Bridge message for unknown request dropped");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Removes the pending entry and tears the context down on every exit path.
struct PendingGuard<'a> {
    strategy: &'a BridgeStrategy,
    id: String,
    context: Option<ContextId>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.strategy.inbox.cancel(&self.id);
        if let Some(context) = self.context {
            self.strategy.host.unmount(context);
        }
        metrics::record_bridge_pending(self.strategy.inbox.len());
    }
}

/// Runs requests inside contexts created by a [`BridgeHost`].
#[derive(Debug, Clone)]
pub struct BridgeStrategy {
    host: Arc<dyn BridgeHost>,
    inbox: BridgeInbox,
    timeout: Duration,
}

fn new_request_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_ID_LEN)
        .map(char::from)
        .collect()
}

impl BridgeStrategy {
    pub fn new(host: Arc<dyn BridgeHost>, timeout: Duration) -> Self {
        Self {
            host,
            inbox: BridgeInbox::new(),
            timeout,
        }
    }

    /// Number of calls still awaiting a message.
    pub fn pending_count(&self) -> usize {
        self.inbox.len()
    }

    pub fn host(&self) -> &dyn BridgeHost {
        self.host.as_ref()
    }

    pub async fn run(&self, url: &str, method: Method, body: Option<String>) -> RequestResult<ParsedBody> {
        let id = new_request_id();
        // The reply slot exists before the context does, so a fast context
        // cannot post unseen.
        let replied = self.inbox.register(&id, self.timeout);
        let mut guard = PendingGuard {
            strategy: self,
            id: id.clone(),
            context: None,
        };
        metrics::record_bridge_pending(self.inbox.len());

        let document = BridgeDocument {
            request_id: id.clone(),
            url: url.to_string(),
            method,
            body,
        };
        let context = self.host.mount(document, self.inbox.clone())?;
        guard.context = Some(context);
        self.inbox.attach(&id, context);

        tracing::debug!(request_id = %id, context, url = %url, "Bridge request issued");

        let wait = async {
            match replied.await {
                Ok(outcome) => outcome.map_err(RequestError::BridgeRemote),
                Err(_) => Err(RequestError::BridgeLoadError("context closed without replying".into())),
            }
        };

        let secs = self.timeout.as_secs();
        let result = with_deadline(self.timeout, wait, || RequestError::BridgeTimeout(secs)).await;
        drop(guard);
        result
    }
}
