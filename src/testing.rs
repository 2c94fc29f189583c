//! In-memory doubles for the platform seams, shared by unit tests.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Mutex;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

use crate::client::types::{ParsedBody, RequestError};
use crate::strategy::bridge::{BridgeDocument, BridgeHost, BridgeInbox, BridgeMessage, ContextId};
use crate::strategy::script::{CallbackRegistry, InjectedScript, ScriptId, ScriptLoader, CALLBACK_PARAM};
use crate::transport::{OutboundRequest, RawResponse, Transport, TransportError};

type Handler = dyn Fn(&OutboundRequest) -> Result<RawResponse, TransportError> + Send + Sync;

/// Transport answering from a closure and recording every request.
pub struct MockTransport {
    handler: Option<Box<Handler>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&OutboundRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A transport whose requests never complete.
    pub fn hanging() -> Self {
        Self {
            handler: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().expect("mock transport mutex poisoned").clone()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport").finish_non_exhaustive()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        self.requests
            .lock()
            .expect("mock transport mutex poisoned")
            .push(request.clone());
        match &self.handler {
            Some(handler) => {
                let result = handler(&request);
                async move { result }.boxed()
            }
            None => std::future::pending::<Result<RawResponse, TransportError>>().boxed(),
        }
    }
}

/// How [`MockBridgeHost`] contexts behave.
#[derive(Debug, Clone)]
pub enum MockBridgeReply {
    Ok(ParsedBody),
    Err(String),
    /// Post a message for another request id first.
    ForeignThenOk(ParsedBody),
    /// Reply with the document URL as text.
    EchoUrl,
    LoadError,
    Silent,
    /// Hold the reply until [`MockBridgeHost::release_deferred`].
    Deferred,
}

#[derive(Debug)]
pub struct MockBridgeHost {
    reply: MockBridgeReply,
    live: Mutex<HashSet<ContextId>>,
    mounted: Mutex<Vec<BridgeDocument>>,
    deferred: Mutex<Vec<(String, BridgeInbox)>>,
}

impl MockBridgeHost {
    pub fn new(reply: MockBridgeReply) -> Self {
        Self {
            reply,
            live: Mutex::new(HashSet::new()),
            mounted: Mutex::new(Vec::new()),
            deferred: Mutex::new(Vec::new()),
        }
    }

    pub fn mounted(&self) -> Vec<BridgeDocument> {
        self.mounted.lock().expect("mock bridge mutex poisoned").clone()
    }

    /// Post `body` for every held reply; returns how many were delivered.
    pub fn release_deferred(&self, body: ParsedBody) -> usize {
        let held = std::mem::take(&mut *self.deferred.lock().expect("mock bridge mutex poisoned"));
        held.into_iter()
            .filter(|(request_id, inbox)| {
                inbox.post(BridgeMessage {
                    request_id: request_id.clone(),
                    outcome: Ok(body.clone()),
                })
            })
            .count()
    }
}

impl BridgeHost for MockBridgeHost {
    fn mount(&self, document: BridgeDocument, inbox: BridgeInbox) -> Result<ContextId, RequestError> {
        if let MockBridgeReply::LoadError = self.reply {
            return Err(RequestError::BridgeLoadError("context refused to load".into()));
        }

        let mut mounted = self.mounted.lock().expect("mock bridge mutex poisoned");
        mounted.push(document.clone());
        let id = mounted.len() as ContextId;
        self.live.lock().expect("mock bridge mutex poisoned").insert(id);

        let reply = |outcome| {
            inbox.post(BridgeMessage {
                request_id: document.request_id.clone(),
                outcome,
            });
        };
        match &self.reply {
            MockBridgeReply::Ok(body) => reply(Ok(body.clone())),
            MockBridgeReply::Err(message) => reply(Err(message.clone())),
            MockBridgeReply::ForeignThenOk(body) => {
                inbox.post(BridgeMessage {
                    request_id: "someone-else".into(),
                    outcome: Err("not yours".into()),
                });
                reply(Ok(body.clone()));
            }
            MockBridgeReply::EchoUrl => reply(Ok(ParsedBody::Text(document.url.clone()))),
            MockBridgeReply::Deferred => self
                .deferred
                .lock()
                .expect("mock bridge mutex poisoned")
                .push((document.request_id.clone(), inbox.clone())),
            MockBridgeReply::LoadError | MockBridgeReply::Silent => {}
        }
        Ok(id)
    }

    fn unmount(&self, id: ContextId) {
        self.live.lock().expect("mock bridge mutex poisoned").remove(&id);
    }

    fn live_contexts(&self) -> usize {
        self.live.lock().expect("mock bridge mutex poisoned").len()
    }
}

/// How [`MockScriptLoader`] scripts behave.
#[derive(Debug, Clone)]
pub enum MockScriptReply {
    Invoke(serde_json::Value),
    LoadError(String),
    Silent,
}

#[derive(Debug)]
pub struct MockScriptLoader {
    reply: MockScriptReply,
    sources: Mutex<Vec<String>>,
    live: Mutex<HashSet<ScriptId>>,
    // Keeps silent scripts' error channels open.
    parked: Mutex<Vec<oneshot::Sender<String>>>,
}

impl MockScriptLoader {
    pub fn new(reply: MockScriptReply) -> Self {
        Self {
            reply,
            sources: Mutex::new(Vec::new()),
            live: Mutex::new(HashSet::new()),
            parked: Mutex::new(Vec::new()),
        }
    }

    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().expect("mock loader mutex poisoned").clone()
    }
}

impl ScriptLoader for MockScriptLoader {
    fn inject(&self, src: String, callbacks: CallbackRegistry) -> InjectedScript {
        let mut sources = self.sources.lock().expect("mock loader mutex poisoned");
        sources.push(src.clone());
        let id = sources.len() as ScriptId;
        self.live.lock().expect("mock loader mutex poisoned").insert(id);

        let (error_tx, load_error) = oneshot::channel();
        match &self.reply {
            MockScriptReply::Invoke(payload) => {
                let name = Url::parse(&src)
                    .ok()
                    .and_then(|u| {
                        u.query_pairs()
                            .find(|(k, _)| k == CALLBACK_PARAM)
                            .map(|(_, v)| v.into_owned())
                    })
                    .unwrap_or_default();
                callbacks.invoke(&name, payload.clone());
            }
            MockScriptReply::LoadError(message) => {
                let _ = error_tx.send(message.clone());
            }
            MockScriptReply::Silent => {
                self.parked.lock().expect("mock loader mutex poisoned").push(error_tx);
            }
        }
        InjectedScript { id, load_error }
    }

    fn remove(&self, id: ScriptId) {
        self.live.lock().expect("mock loader mutex poisoned").remove(&id);
    }

    fn injected_count(&self) -> usize {
        self.live.lock().expect("mock loader mutex poisoned").len()
    }
}

/// Serve `response` verbatim to every connection on an ephemeral port.
pub async fn serve_raw(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                }
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}
