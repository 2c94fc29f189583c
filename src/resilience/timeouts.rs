//! Timeout enforcement.
//!
//! # Responsibilities
//! - Give every strategy a deadline (direct/relay, bridge, script callback)
//! - Report elapsed deadlines as distinct errors
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Direct and relay attempts get a ceiling too; nothing waits unbounded

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::config::TimeoutConfig;

/// Per-strategy deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyTimeouts {
    pub request: Duration,
    pub bridge: Duration,
    pub script: Duration,
}

impl Default for StrategyTimeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for StrategyTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            request: Duration::from_secs(config.request_secs),
            bridge: Duration::from_secs(config.bridge_secs),
            script: Duration::from_secs(config.script_secs),
        }
    }
}

/// Run `fut` under `deadline`, mapping expiry through `on_timeout`.
pub async fn with_deadline<T, E, F>(deadline: Duration, fut: F, on_timeout: impl FnOnce() -> E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}
