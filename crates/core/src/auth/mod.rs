mod api_key;
mod none;
mod traits;
mod types;

pub use api_key::*;
pub use none::*;
pub use traits::*;
pub use types::*;

use crate::config::AuthConfig;

use std::collections::HashMap;

/// Build the authenticator selected by `auth.method`.
///
/// API keys must be unique: one key naming two users would make request
/// ownership ambiguous.
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator)),
        AuthMethod::ApiKey => {
            if config.keys.is_empty() {
                return Err(AuthError::ConfigurationError(
                    "api_key auth needs at least one auth.keys entry".to_string(),
                ));
            }

            let mut owners: HashMap<&str, &str> = HashMap::new();
            for entry in &config.keys {
                if let Some(previous) = owners.insert(&entry.key, &entry.user_id) {
                    if previous != entry.user_id {
                        return Err(AuthError::ConfigurationError(format!(
                            "API key shared by users '{}' and '{}'",
                            previous, entry.user_id
                        )));
                    }
                }
            }

            Ok(Box::new(ApiKeyAuthenticator::new(config.keys.clone())))
        }
    }
}
