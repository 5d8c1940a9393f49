use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Single-user mode: every caller is the anonymous user, so all indexer
/// configs and downloads share one owner.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }

    fn requires_credentials(&self) -> bool {
        false
    }
}
