//! Remote script injection.
//!
//! # Responsibilities
//! - Load a remote script by URL
//! - Evaluate callback-invocation scripts (`name(payload);`) against the
//!   callback registry
//! - Report load failures; remove injected scripts on request

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::strategy::script::callbacks::CallbackRegistry;

/// Handle of an injected script.
pub type ScriptId = u64;

/// A script reference that has been injected.
#[derive(Debug)]
pub struct InjectedScript {
    pub id: ScriptId,
    /// Fires with a description if the script fails to load. Closed without
    /// a value when loading succeeded.
    pub load_error: oneshot::Receiver<String>,
}

/// Platform seam for injecting remote scripts.
pub trait ScriptLoader: Send + Sync + fmt::Debug {
    fn inject(&self, src: String, callbacks: CallbackRegistry) -> InjectedScript;

    /// Remove an injected script. Unknown ids are ignored.
    fn remove(&self, id: ScriptId);

    fn injected_count(&self) -> usize;
}

/// Split a callback-invocation script into the callback name and payload.
///
/// Accepts `name(payload)`, `name(payload);`, a leading `/**/` guard and a
/// `window.` prefix on the name.
pub fn parse_invocation(script: &str) -> Option<(String, Value)> {
    let s = script.trim();
    let s = s.strip_prefix("/**/").unwrap_or(s).trim();
    let s = s.strip_suffix(';').unwrap_or(s).trim_end();

    let open = s.find('(')?;
    let name = s[..open].trim();
    let name = name.strip_prefix("window.").unwrap_or(name);
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return None;
    }

    let args = s[open + 1..].strip_suffix(')')?;
    let payload = serde_json::from_str(args.trim()).ok()?;
    Some((name.to_string(), payload))
}

/// Loads scripts over HTTP and evaluates callback invocations.
#[derive(Debug)]
pub struct HttpScriptLoader {
    client: Client,
    scripts: DashMap<ScriptId, JoinHandle<()>>,
    next_id: AtomicU64,
}

impl HttpScriptLoader {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            scripts: DashMap::new(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn load(client: Client, src: String) -> Result<String, String> {
        let response = client.get(&src).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {} loading {}", status.as_u16(), src));
        }
        response.text().await.map_err(|e| e.to_string())
    }
}

impl ScriptLoader for HttpScriptLoader {
    fn inject(&self, src: String, callbacks: CallbackRegistry) -> InjectedScript {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (error_tx, load_error) = oneshot::channel();
        let client = self.client.clone();

        let handle = tokio::spawn(async move {
            match Self::load(client, src.clone()).await {
                Ok(script) => match parse_invocation(&script) {
                    Some((name, payload)) => {
                        if !callbacks.invoke(&name, payload) {
                            tracing::debug!(callback = %name, "Script invoked an unknown callback");
                        }
                    }
                    None => tracing::warn!(src = %src, "Script did not invoke a callback"),
                },
                Err(e) => {
                    let _ = error_tx.send(e);
                }
            }
        });
        self.scripts.insert(id, handle);

        InjectedScript { id, load_error }
    }

    fn remove(&self, id: ScriptId) {
        if let Some((_, handle)) = self.scripts.remove(&id) {
            handle.abort();
        }
    }

    fn injected_count(&self) -> usize {
        self.scripts.len()
    }
}
