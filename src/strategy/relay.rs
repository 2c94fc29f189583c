//! Relay strategy: re-issue the request through a public relay.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::client::types::{ParsedBody, RequestOptions, RequestResult};
use crate::resilience::timeouts::with_deadline;
use crate::state::{relay_url, RelayRegistry, RequestState};
use crate::transport::{parse_response, OutboundRequest, Transport, TransportError, TransportErrorKind};

/// Header relays such as cors-anywhere require on every call.
pub const REQUESTED_WITH: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

/// Routes a request through the next relay handed out by the registry.
#[derive(Debug, Clone)]
pub struct RelayStrategy {
    transport: Arc<dyn Transport>,
    registry: Arc<RelayRegistry>,
    extra_headers: BTreeMap<String, String>,
    timeout: Duration,
}

impl RelayStrategy {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<RelayRegistry>,
        extra_headers: BTreeMap<String, String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            registry,
            extra_headers,
            timeout,
        }
    }

    pub fn registry(&self) -> &RelayRegistry {
        &self.registry
    }

    /// Send `target` through the next relay, recording it as the active
    /// relay root in `state`.
    pub async fn run(
        &self,
        state: &RequestState,
        target: &str,
        options: &RequestOptions,
    ) -> RequestResult<ParsedBody> {
        let relay = self.registry.next();
        let url = relay_url(&relay, target);
        state.set_relay_root(relay.clone());

        let mut headers = options.headers.clone();
        headers.insert(REQUESTED_WITH.0.to_string(), REQUESTED_WITH.1.to_string());
        for (name, value) in &self.extra_headers {
            headers.insert(name.clone(), value.clone());
        }

        tracing::debug!(relay = %relay, target = %target, "Routing request through relay");

        let request = OutboundRequest {
            method: options.method,
            url,
            headers,
            body: options.body.clone(),
            mode: options.mode,
        };

        let secs = self.timeout.as_secs();
        let raw = with_deadline(self.timeout, self.transport.send(request), || {
            TransportError::new(
                TransportErrorKind::Timeout,
                format!("relay {} timed out after {}s", relay, secs),
            )
        })
        .await?;

        parse_response(raw)
    }
}
