//! Direct strategy: call the target root as-is.

use std::sync::Arc;
use std::time::Duration;

use crate::client::types::{ParsedBody, RequestOptions, RequestResult};
use crate::resilience::timeouts::with_deadline;
use crate::transport::{parse_response, OutboundRequest, Transport, TransportError, TransportErrorKind};

/// Issues the request straight to the target URL.
#[derive(Debug, Clone)]
pub struct DirectStrategy {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl DirectStrategy {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub async fn run(&self, url: &str, options: &RequestOptions) -> RequestResult<ParsedBody> {
        let request = OutboundRequest {
            method: options.method,
            url: url.to_string(),
            headers: options.headers.clone(),
            body: options.body.clone(),
            mode: options.mode,
        };

        let secs = self.timeout.as_secs();
        let raw = with_deadline(self.timeout, self.transport.send(request), || {
            TransportError::new(TransportErrorKind::Timeout, format!("request timed out after {}s", secs))
        })
        .await?;

        parse_response(raw)
    }
}
