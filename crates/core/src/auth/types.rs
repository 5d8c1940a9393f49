use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Authenticated identity. `user_id` scopes indexer configs and downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub claims: HashMap<String, serde_json::Value>,
}

impl Identity {
    pub const ANONYMOUS: &'static str = "anonymous";

    pub fn for_user(user_id: impl Into<String>, method: &str) -> Self {
        Self {
            user_id: user_id.into(),
            method: method.to_string(),
            claims: HashMap::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::for_user(Self::ANONYMOUS, "none")
    }
}
