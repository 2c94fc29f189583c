//! Script-callback strategy: the last rung of the ladder.
//!
//! # Data Flow
//! ```text
//! run(url)
//!     → unique callback name registered in CallbackRegistry
//!     → url + ?callback=<name>
//!     → ScriptLoader::inject(src)
//!     → settle once: callback invoked | ScriptLoadError | ScriptCallbackTimeout
//!     → guard drop: callback unregistered, script removed
//! ```
//!
//! # Design Decisions
//! - GET-shaped reads only; nothing but the URL reaches the remote
//! - Callback names are UUID based so concurrent calls never collide

pub mod callbacks;
pub mod loader;

use std::sync::Arc;
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::client::types::{ParsedBody, RequestError, RequestResult};
use crate::resilience::timeouts::with_deadline;

pub use callbacks::CallbackRegistry;
pub use loader::{parse_invocation, HttpScriptLoader, InjectedScript, ScriptId, ScriptLoader};

/// Query parameter carrying the callback name.
pub const CALLBACK_PARAM: &str = "callback";

struct ScriptGuard<'a> {
    strategy: &'a ScriptCallbackStrategy,
    name: String,
    script: Option<ScriptId>,
}

impl Drop for ScriptGuard<'_> {
    fn drop(&mut self) {
        self.strategy.callbacks.remove(&self.name);
        if let Some(script) = self.script {
            self.strategy.loader.remove(script);
        }
    }
}

/// Receives data by having a remote script invoke a registered callback.
#[derive(Debug, Clone)]
pub struct ScriptCallbackStrategy {
    loader: Arc<dyn ScriptLoader>,
    callbacks: CallbackRegistry,
    timeout: Duration,
}

fn callback_name() -> String {
    format!("jsonp_callback_{}", Uuid::new_v4().simple())
}

/// Append `callback=<name>` to `url`.
pub fn with_callback_param(url: &str, name: &str) -> RequestResult<String> {
    let mut parsed = Url::parse(url).map_err(|_| RequestError::InvalidUrl(url.to_string()))?;
    parsed.query_pairs_mut().append_pair(CALLBACK_PARAM, name);
    Ok(parsed.into())
}

impl ScriptCallbackStrategy {
    pub fn new(loader: Arc<dyn ScriptLoader>, timeout: Duration) -> Self {
        Self {
            loader,
            callbacks: CallbackRegistry::new(),
            timeout,
        }
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn loader(&self) -> &dyn ScriptLoader {
        self.loader.as_ref()
    }

    pub async fn run(&self, url: &str) -> RequestResult<ParsedBody> {
        let name = callback_name();
        let src = with_callback_param(url, &name)?;

        let invoked = self.callbacks.register(&name);
        let mut guard = ScriptGuard {
            strategy: self,
            name: name.clone(),
            script: None,
        };
        let injected = self.loader.inject(src.clone(), self.callbacks.clone());
        guard.script = Some(injected.id);

        tracing::debug!(callback = %name, src = %src, "Script reference injected");

        let load_error = injected.load_error;
        let load_failed = async move {
            match load_error.await {
                Ok(message) => message,
                // Loaded fine; only the callback or the deadline can settle now.
                Err(_) => std::future::pending().await,
            }
        };

        let wait = async {
            tokio::select! {
                payload = invoked => payload
                    .map(ParsedBody::Json)
                    .map_err(|_| RequestError::ScriptLoadError("callback was unregistered".into())),
                message = load_failed => Err(RequestError::ScriptLoadError(message)),
            }
        };

        let secs = self.timeout.as_secs();
        let result = with_deadline(self.timeout, wait, || RequestError::ScriptCallbackTimeout(secs)).await;
        drop(guard);
        result
    }
}
