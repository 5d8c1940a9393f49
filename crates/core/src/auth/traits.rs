use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

#[derive(Debug, Error)]
pub enum AuthError {
    /// No credentials were presented.
    #[error("Missing credentials")]
    NotAuthenticated,

    #[error("Rejected credentials: {0}")]
    InvalidCredentials(String),

    #[error("Authenticator misconfigured: {0}")]
    ConfigurationError(String),
}

impl AuthError {
    /// Label used for the auth failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::NotAuthenticated => "not_authenticated",
            AuthError::InvalidCredentials(_) => "invalid_credentials",
            AuthError::ConfigurationError(_) => "internal_error",
        }
    }
}

/// Resolves an incoming request to the user it acts on behalf of.
///
/// Indexer configs and downloads are owned by the resolved `user_id`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name reported in logs and `/config`.
    fn method_name(&self) -> &'static str;

    /// Whether requests must carry credentials. When false the HTTP layer
    /// skips header collection and uses the anonymous user.
    fn requires_credentials(&self) -> bool {
        true
    }
}
