//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::WithdrawConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
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
pub fn parse_config(content: &str) -> Result<WithdrawConfig, ConfigError> {
    let config: WithdrawConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
///
/// A missing file is not an error: defaults are validated and returned so
/// `gd-withdraw` can run against a local node without any setup.
pub fn load_config(path: &Path) -> Result<WithdrawConfig, ConfigError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        let config = WithdrawConfig::default();
        validate_config(&config).map_err(ConfigError::Validation)?;
        return Ok(config);
    }

    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}
