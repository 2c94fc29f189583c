//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate API and relay roots are absolute http(s) URLs
//! - Validate value ranges (timeouts > 0, relay list non-empty)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not an absolute http(s) URL")]
    InvalidUrl { field: String, value: String },

    #[error("relays.endpoints must not be empty")]
    NoRelays,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("api.production_root", &config.api.production_root),
        ("api.development_root", &config.api.development_root),
    ] {
        if !is_http_url(value) {
            errors.push(ValidationError::InvalidUrl {
                field: field.to_string(),
                value: value.clone(),
            });
        }
    }

    if !config.relays.initial_root.is_empty() && !is_http_url(&config.relays.initial_root) {
        errors.push(ValidationError::InvalidUrl {
            field: "relays.initial_root".to_string(),
            value: config.relays.initial_root.clone(),
        });
    }

    if config.relays.endpoints.is_empty() {
        errors.push(ValidationError::NoRelays);
    }
    for (i, relay) in config.relays.endpoints.iter().enumerate() {
        if !is_http_url(relay) {
            errors.push(ValidationError::InvalidUrl {
                field: format!("relays.endpoints[{}]", i),
                value: relay.clone(),
            });
        }
    }

    if let Some(origin) = &config.cors.origin {
        if !is_http_url(origin) {
            errors.push(ValidationError::InvalidUrl {
                field: "cors.origin".to_string(),
                value: origin.clone(),
            });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }
    if config.timeouts.bridge_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.bridge_secs"));
    }
    if config.timeouts.script_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.script_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
