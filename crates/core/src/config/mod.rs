mod loader;
mod types;
mod validate;

pub use loader::{config_path_from_env, load_config, load_config_from_str, CONFIG_PATH_ENV};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

/// Errors raised while loading or checking the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config file at {0} (set {CONFIG_PATH_ENV} to point elsewhere)")]
    FileNotFound(String),

    #[error("Invalid config: {0}")]
    ParseError(String),

    #[error("Config rejected: {0}")]
    ValidationError(String),
}
