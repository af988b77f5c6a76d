use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeRequest {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    /// Identity of the resource owner granting access.
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub redirect_uri: String,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
}

/// RFC 6749 section 5.1 token response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// RFC 6749 error response, with the HTTP status it should be served under.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}: {description}")]
pub struct AccessError {
    pub error: String,
    pub description: String,
    pub status: u16,
}

impl AccessError {
    pub fn new(error: impl Into<String>, description: impl Into<String>, status: u16) -> Self {
        Self {
            error: error.into(),
            description: description.into(),
            status,
        }
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new("invalid_request", description, 400)
    }

    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new("invalid_client", description, 401)
    }

    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new("invalid_grant", description, 400)
    }

    pub fn unsupported(error: &str, description: impl Into<String>) -> Self {
        Self::new(error, description, 400)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error,
            "error_description": self.description,
        })
    }
}

/// The authorization server backing the `oauth2` blocks.
#[async_trait]
pub trait AccessController: Send + Sync {
    async fn authorize(&self, req: AuthorizeRequest) -> Result<AuthorizationCode, AccessError>;
    async fn token(&self, req: TokenRequest) -> Result<AccessToken, AccessError>;
}
