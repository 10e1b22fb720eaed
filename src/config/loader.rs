//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{FundedAccountConfig, HarnessConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `funded_account.private_key`.
pub const FUNDED_KEY_ENV_VAR: &str = "XCHAIN_FUNDED_PRIVATE_KEY";

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

impl FundedAccountConfig {
    /// The key to use: the environment override if set, else the file value.
    pub fn resolve_private_key(&self) -> String {
        std::env::var(FUNDED_KEY_ENV_VAR).unwrap_or_else(|_| self.private_key.clone())
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<HarnessConfig, ConfigError> {
    let config: HarnessConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}
