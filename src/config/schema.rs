//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for a request client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Development or production. Only selects the target root.
    pub environment: Environment,

    /// Target API roots.
    pub api: ApiConfig,

    /// Relay endpoints used when direct access is refused.
    pub relays: RelayConfig,

    /// Escalation thresholds.
    pub escalation: EscalationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Cross-origin enforcement for direct and relay attempts.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// The API root selected by the environment flag.
    pub fn api_root(&self) -> &str {
        match self.environment {
            Environment::Development => &self.api.development_root,
            Environment::Production => &self.api.production_root,
        }
    }
}

/// Ambient deployment flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Target API roots, one per environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root used when `environment = "production"`.
    pub production_root: String,

    /// Root used when `environment = "development"`.
    pub development_root: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            production_root: "https://api.example.org".to_string(),
            development_root: "http://localhost:3000".to_string(),
        }
    }
}

/// Relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// First relay handed out; added to the front of `endpoints` when not
    /// already listed. Empty starts at the head of `endpoints`.
    pub initial_root: String,

    /// Ordered relay list handed out round-robin.
    pub endpoints: Vec<String>,

    /// Extra headers sent on every relay attempt.
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            initial_root: String::new(),
            endpoints: default_relays(),
            extra_headers: BTreeMap::new(),
        }
    }
}

/// The three well-known public relays.
pub fn default_relays() -> Vec<String> {
    vec![
        "https://corsproxy.io/?".to_string(),
        "https://api.allorigins.win/raw?url=".to_string(),
        "https://cors-anywhere.herokuapp.com/".to_string(),
    ]
}

/// Escalation thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Cross-origin failures tolerated before direct and relay attempts are
    /// abandoned for the session.
    pub max_retries: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Timeout configuration for each strategy, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Ceiling for a single direct or relay attempt.
    pub request_secs: u64,

    /// Ceiling for a bridge attempt.
    pub bridge_secs: u64,

    /// Ceiling for a script-callback attempt.
    pub script_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 10,
            bridge_secs: 10,
            script_secs: 10,
        }
    }
}

/// Cross-origin enforcement.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Origin the client presents. When set, direct and relay responses must
    /// allow it through `Access-Control-Allow-Origin`.
    pub origin: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
