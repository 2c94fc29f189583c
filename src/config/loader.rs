//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{ClientConfig, Environment};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the `environment` flag.
pub const ENVIRONMENT_VAR: &str = "RESILIENT_FETCH_ENV";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Environment(String),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Environment(e) => write!(f, "{}: {}", ENVIRONMENT_VAR, e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Apply `RESILIENT_FETCH_ENV` on top of a loaded configuration.
pub fn apply_env_override(mut config: ClientConfig) -> Result<ClientConfig, ConfigError> {
    if let Ok(value) = std::env::var(ENVIRONMENT_VAR) {
        config.environment = value
            .parse::<Environment>()
            .map_err(ConfigError::Environment)?;
    }
    Ok(config)
}
