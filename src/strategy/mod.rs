//! Transport strategies, cheapest first.
//!
//! # Escalation Ladder
//! ```text
//! direct.rs   → straight to the API root
//! relay.rs    → through the next relay from the registry
//! bridge/     → inside an isolated context, result posted back by request id
//! script/     → remote script invokes a pre-registered callback (GET only)
//! ```
//!
//! # Design Decisions
//! - Strategies never swallow errors; they return them to the facade
//! - Each strategy owns its deadline
//! - Bridge and script strategies release their resources through guards,
//!   so every exit path (including a dropped future) cleans up

pub mod bridge;
pub mod direct;
pub mod relay;
pub mod script;

use std::fmt;

pub use bridge::{BridgeHost, BridgeStrategy, IsolatedTaskHost};
pub use direct::DirectStrategy;
pub use relay::RelayStrategy;
pub use script::{CallbackRegistry, HttpScriptLoader, ScriptCallbackStrategy, ScriptLoader};

/// Rungs of the escalation ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Direct,
    Relay,
    Bridge,
    ScriptCallback,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Direct => "direct",
            StrategyKind::Relay => "relay",
            StrategyKind::Bridge => "bridge",
            StrategyKind::ScriptCallback => "script_callback",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
