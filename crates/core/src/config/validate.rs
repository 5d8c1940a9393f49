use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - `api_key` auth has at least one complete key entry
/// - Timeouts are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if matches!(config.auth.method, AuthMethod::ApiKey) {
        if config.auth.keys.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.keys must contain at least one entry when method = \"api_key\"".to_string(),
            ));
        }
        if let Some(entry) = config
            .auth
            .keys
            .iter()
            .find(|k| k.key.trim().is_empty() || k.user_id.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "auth.keys entry for user '{}' has an empty key or user_id",
                entry.user_id
            )));
        }
    }

    if config.search.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "search.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.downloads.inspect_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "downloads.inspect_timeout_secs cannot be 0".to_string(),
        ));
    }

    if let Some(engine) = &config.engine {
        if engine.metadata_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "engine.metadata_timeout_secs cannot be 0".to_string(),
            ));
        }
    }

    Ok(())
}
