//! The request client: single entry point for every feature module.
//!
//! # Escalation
//! ```text
//! failures > max_retries ───────────────────────────────┐
//!                                                       ▼
//! Direct (or Relay when use_relay) ──fail──▶ classify   Bridge ──fail──▶ ScriptCallback (GET)
//!    │                                  │                ▲
//!    │        cross-origin/unreachable: │ count += 1     │
//!    │          count ≤ max, was Direct ─▶ Relay ─fail──┘
//!    │          otherwise ───────────────────────────────┘
//!    │        http status: was Direct, !catch_error ─▶ Relay once (catch_error forced)
//!    ▼
//! ParsedBody | {error:true,message} (catch_error) | RequestError
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::client::types::{Method, ParsedBody, RequestError, RequestOptions, RequestResult};
use crate::config::ClientConfig;
use crate::observability::metrics;
use crate::resilience::{ErrorClassifier, StrategyTimeouts, StructuredClassifier};
use crate::state::{RelayRegistry, RequestState, StateSnapshot};
use crate::strategy::{
    BridgeHost, BridgeStrategy, DirectStrategy, HttpScriptLoader, IsolatedTaskHost, RelayStrategy,
    ScriptCallbackStrategy, ScriptLoader, StrategyKind,
};
use crate::transport::{HttpTransport, Transport, TransportError, TransportErrorKind};

/// Bookkeeping for one logical call.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    pub endpoint: String,
    pub options: RequestOptions,
    pub tried: Vec<StrategyKind>,
}

impl RequestAttempt {
    fn new(endpoint: &str, options: &RequestOptions) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            options: options.clone(),
            tried: Vec::new(),
        }
    }

    fn last(&self) -> Option<StrategyKind> {
        self.tried.last().copied()
    }

    fn trail(&self) -> String {
        self.tried.iter().map(StrategyKind::as_str).collect::<Vec<_>>().join(" → ")
    }
}

#[derive(Debug)]
struct Inner {
    state: RequestState,
    classifier: Box<dyn ErrorClassifier>,
    direct: DirectStrategy,
    relay: RelayStrategy,
    bridge: BridgeStrategy,
    script: ScriptCallbackStrategy,
}

/// Resilient request client.
///
/// Cheap to clone; clones share state, so a failure discovered by one
/// caller changes strategy selection for all of them.
#[derive(Debug, Clone)]
pub struct RequestClient {
    inner: Arc<Inner>,
}

/// Builder wiring the platform seams of a [`RequestClient`].
#[derive(Debug)]
pub struct RequestClientBuilder {
    state: RequestState,
    relays: RelayRegistry,
    relay_headers: BTreeMap<String, String>,
    timeouts: StrategyTimeouts,
    origin: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    bridge_host: Option<Arc<dyn BridgeHost>>,
    script_loader: Option<Arc<dyn ScriptLoader>>,
    classifier: Option<Box<dyn ErrorClassifier>>,
}

impl RequestClientBuilder {
    pub fn new(state: RequestState, relays: RelayRegistry) -> Self {
        Self {
            state,
            relays,
            relay_headers: BTreeMap::new(),
            timeouts: StrategyTimeouts::default(),
            origin: None,
            transport: None,
            bridge_host: None,
            script_loader: None,
            classifier: None,
        }
    }

    pub fn timeouts(mut self, timeouts: StrategyTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Origin presented by the default transport.
    pub fn origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }

    pub fn relay_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.relay_headers = headers;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn bridge_host(mut self, host: Arc<dyn BridgeHost>) -> Self {
        self.bridge_host = Some(host);
        self
    }

    pub fn script_loader(mut self, loader: Arc<dyn ScriptLoader>) -> Self {
        self.script_loader = Some(loader);
        self
    }

    pub fn classifier(mut self, classifier: Box<dyn ErrorClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn build(self) -> RequestResult<RequestClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(self.timeouts.request, self.origin)?),
        };
        let bridge_host: Arc<dyn BridgeHost> = match self.bridge_host {
            Some(h) => h,
            None => Arc::new(IsolatedTaskHost::new(self.timeouts.bridge)),
        };
        let script_loader: Arc<dyn ScriptLoader> = match self.script_loader {
            Some(l) => l,
            None => Arc::new(HttpScriptLoader::new(self.timeouts.script).map_err(|e| {
                RequestError::Transport(TransportError::new(TransportErrorKind::Other, e.to_string()))
            })?),
        };

        let inner = Inner {
            state: self.state,
            classifier: self.classifier.unwrap_or_else(|| Box::new(StructuredClassifier::default())),
            direct: DirectStrategy::new(transport.clone(), self.timeouts.request),
            relay: RelayStrategy::new(
                transport,
                Arc::new(self.relays),
                self.relay_headers,
                self.timeouts.request,
            ),
            bridge: BridgeStrategy::new(bridge_host, self.timeouts.bridge),
            script: ScriptCallbackStrategy::new(script_loader, self.timeouts.script),
        };

        Ok(RequestClient {
            inner: Arc::new(inner),
        })
    }
}

impl RequestClient {
    pub fn builder(state: RequestState, relays: RelayRegistry) -> RequestClientBuilder {
        RequestClientBuilder::new(state, relays)
    }

    /// Build a client with the production transport, bridge host and
    /// script loader.
    pub fn from_config(config: &ClientConfig) -> RequestResult<Self> {
        let state = RequestState::new(
            config.api_root(),
            config.relays.initial_root.clone(),
            config.environment,
            config.escalation.max_retries,
        );
        let relays = RelayRegistry::starting_at(config.relays.endpoints.clone(), &config.relays.initial_root)
            .ok_or_else(|| RequestError::InvalidUrl("relay list is empty".into()))?;

        tracing::info!(
            api_root = %state.api_root(),
            environment = %config.environment,
            relays = relays.len(),
            max_retries = config.escalation.max_retries,
            "Request client configured"
        );

        Self::builder(state, relays)
            .timeouts(StrategyTimeouts::from(&config.timeouts))
            .origin(config.cors.origin.clone())
            .relay_headers(config.relays.extra_headers.clone())
            .build()
    }

    pub fn state(&self) -> &RequestState {
        &self.inner.state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.state.snapshot()
    }

    pub fn relays(&self) -> &RelayRegistry {
        self.inner.relay.registry()
    }

    pub fn bridge(&self) -> &BridgeStrategy {
        &self.inner.bridge
    }

    pub fn script(&self) -> &ScriptCallbackStrategy {
        &self.inner.script
    }

    /// Perform a request, escalating through the strategy ladder.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> RequestResult<ParsedBody> {
        let target = self.inner.state.resolve(endpoint);
        let mut attempt = RequestAttempt::new(endpoint, &options);

        let outcome = self.escalate(&target, &options, &mut attempt).await;
        self.settle(outcome, &attempt)
    }

    pub async fn get(&self, endpoint: &str) -> RequestResult<ParsedBody> {
        self.request(endpoint, RequestOptions::get()).await
    }

    pub async fn post_json<T: Serialize>(&self, endpoint: &str, body: &T) -> RequestResult<ParsedBody> {
        self.request(endpoint, Self::json_options(Method::Post, body)?).await
    }

    pub async fn put_json<T: Serialize>(&self, endpoint: &str, body: &T) -> RequestResult<ParsedBody> {
        self.request(endpoint, Self::json_options(Method::Put, body)?).await
    }

    pub async fn delete(&self, endpoint: &str) -> RequestResult<ParsedBody> {
        self.request(endpoint, RequestOptions::new(Method::Delete)).await
    }

    fn json_options<T: Serialize>(method: Method, body: &T) -> RequestResult<RequestOptions> {
        RequestOptions::new(method).json(body).map_err(|e| RequestError::Parse {
            status: 0,
            message: format!("failed to serialize request body: {}", e),
        })
    }

    async fn escalate(
        &self,
        target: &str,
        options: &RequestOptions,
        attempt: &mut RequestAttempt,
    ) -> RequestResult<ParsedBody> {
        let state = &self.inner.state;

        if state.threshold_exceeded() {
            tracing::debug!(
                failures = state.cross_origin_failures(),
                "Direct and relay abandoned for this session"
            );
            return self.last_resort(target, options, attempt).await;
        }

        let primary = if state.use_relay() {
            StrategyKind::Relay
        } else {
            StrategyKind::Direct
        };

        let err = match self.attempt(primary, target, options, attempt).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };
        let class = self.inner.classifier.classify(&err);
        tracing::debug!(strategy = %primary, classification = %class, error = %err, "Attempt failed");

        if class.escalates() {
            let failures = self.record_cross_origin_failure();

            if failures <= state.max_retries() && primary == StrategyKind::Direct {
                match self.attempt(StrategyKind::Relay, target, options, attempt).await {
                    Ok(body) => return Ok(body),
                    Err(e) => tracing::debug!(error = %e, "Relay retry failed"),
                }
            }
            return self.last_resort(target, options, attempt).await;
        }

        if primary == StrategyKind::Direct && !options.catch_error {
            // Forced catch_error: the retry resolves to an error value
            // instead of starting another retry.
            return match self.attempt(StrategyKind::Relay, target, options, attempt).await {
                Ok(body) => Ok(body),
                Err(e) => {
                    let class = self.inner.classifier.classify(&e);
                    tracing::debug!(classification = %class, error = %e, "Relay retry failed");
                    if class.escalates() {
                        self.record_cross_origin_failure();
                    }
                    Ok(ParsedBody::Error {
                        message: error_message(&e),
                    })
                }
            };
        }

        Err(err)
    }

    fn record_cross_origin_failure(&self) -> u32 {
        let failures = self.inner.state.record_cross_origin_failure();
        metrics::record_cross_origin_failures(failures);
        failures
    }

    /// Bridge, then (for GET) script callback. No further recovery after.
    async fn last_resort(
        &self,
        target: &str,
        options: &RequestOptions,
        attempt: &mut RequestAttempt,
    ) -> RequestResult<ParsedBody> {
        let err = match self.attempt(StrategyKind::Bridge, target, options, attempt).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        if options.method != Method::Get {
            tracing::debug!(method = %options.method, "Script callback only carries GET reads");
            return Err(err);
        }

        self.attempt(StrategyKind::ScriptCallback, target, options, attempt).await
    }

    async fn attempt(
        &self,
        kind: StrategyKind,
        target: &str,
        options: &RequestOptions,
        attempt: &mut RequestAttempt,
    ) -> RequestResult<ParsedBody> {
        if let Some(from) = attempt.last() {
            metrics::record_escalation(from.as_str(), kind.as_str());
        }
        attempt.tried.push(kind);

        tracing::debug!(strategy = %kind, target = %target, method = %options.method, "Attempting request");

        let result = match kind {
            StrategyKind::Direct => self.inner.direct.run(target, options).await,
            StrategyKind::Relay => self.inner.relay.run(&self.inner.state, target, options).await,
            StrategyKind::Bridge => {
                self.inner
                    .bridge
                    .run(target, options.method, options.body.clone())
                    .await
            }
            StrategyKind::ScriptCallback => self.inner.script.run(target).await,
        };

        metrics::record_attempt(kind.as_str(), result.is_ok());
        result
    }

    fn settle(&self, outcome: RequestResult<ParsedBody>, attempt: &RequestAttempt) -> RequestResult<ParsedBody> {
        match outcome {
            Ok(body) => Ok(body),
            Err(e) if attempt.options.catch_error => {
                tracing::warn!(
                    endpoint = %attempt.endpoint,
                    tried = %attempt.trail(),
                    error = %e,
                    "All strategies failed, returning error value"
                );
                Ok(ParsedBody::Error {
                    message: error_message(&e),
                })
            }
            Err(e) => {
                tracing::error!(
                    endpoint = %attempt.endpoint,
                    tried = %attempt.trail(),
                    error = %e,
                    "All strategies failed"
                );
                Err(e)
            }
        }
    }
}

fn error_message(err: &RequestError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        "request failed".to_string()
    } else {
        message
    }
}
