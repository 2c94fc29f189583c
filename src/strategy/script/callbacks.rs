//! Globally reachable callbacks for script injection.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;

/// Named one-shot callbacks a loaded script can invoke.
///
/// Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    inner: Arc<DashMap<String, oneshot::Sender<Value>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` and return the receiving end of its invocation.
    pub fn register(&self, name: &str) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.inner.insert(name.to_string(), tx);
        rx
    }

    /// Invoke `name` with `payload`. A callback fires at most once; returns
    /// false when nothing is registered under that name.
    pub fn invoke(&self, name: &str, payload: Value) -> bool {
        match self.inner.remove(name) {
            Some((_, tx)) => tx.send(payload).is_ok(),
            None => false,
        }
    }

    pub fn remove(&self, name: &str) {
        self.inner.remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
