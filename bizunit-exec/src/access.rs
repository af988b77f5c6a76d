//! In-memory authorization server for the `oauth2` blocks.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bizunit_core::config::{AccessConfig, ClientConfig, MAX_TOKEN_TTL_SECS};
use bizunit_core::services::{
    AccessController, AccessError, AccessToken, AuthorizationCode, AuthorizeRequest, TokenRequest,
};
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

const CODE_TTL: Duration = Duration::from_secs(600);
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug)]
struct IssuedCode {
    client_id: String,
    redirect_uri: String,
    /// Whether the authorize request named the redirect URI itself.
    explicit_redirect: bool,
    scope: Option<String>,
    subject: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct IssuedToken {
    client_id: String,
    subject: Option<String>,
    scope: Option<String>,
    expires_at: Instant,
}

/// What a valid bearer token grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub client_id: String,
    pub subject: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    codes: HashMap<String, IssuedCode>,
    tokens: HashMap<String, IssuedToken>,
}

/// Clients come from configuration. Authorization codes are single-use and expire after ten
/// minutes; bearer tokens live for `token_ttl_secs` (one hour by default, at most a year).
#[derive(Debug)]
pub struct StaticAccessController {
    clients: IndexMap<String, ClientConfig>,
    token_ttl_secs: u64,
    state: Mutex<State>,
}

impl StaticAccessController {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            clients: config
                .clients
                .iter()
                .map(|c| (c.client_id.clone(), c.clone()))
                .collect(),
            token_ttl_secs: config
                .token_ttl_secs
                .unwrap_or(DEFAULT_TOKEN_TTL_SECS)
                .min(MAX_TOKEN_TTL_SECS),
            state: Mutex::new(State::default()),
        }
    }

    fn client(&self, client_id: &str) -> Result<&ClientConfig, AccessError> {
        self.clients
            .get(client_id)
            .ok_or_else(|| AccessError::invalid_client(format!("unknown client `{client_id}`")))
    }

    /// Public clients (empty secret) authenticate by id alone.
    fn authenticate(&self, client_id: &str, secret: Option<&str>) -> Result<&ClientConfig, AccessError> {
        let client = self.client(client_id)?;
        if !client.client_secret.is_empty() && secret != Some(client.client_secret.as_str()) {
            return Err(AccessError::invalid_client("client authentication failed"));
        }
        Ok(client)
    }

    fn check_scope(client: &ClientConfig, scope: Option<&str>) -> Result<(), AccessError> {
        let Some(scope) = scope else {
            return Ok(());
        };
        if client.scopes.is_empty() {
            return Ok(());
        }
        match scope.split_whitespace().find(|s| !client.scopes.iter().any(|a| a == s)) {
            Some(denied) => Err(AccessError::new(
                "invalid_scope",
                format!("scope `{denied}` is not allowed for this client"),
                400,
            )),
            None => Ok(()),
        }
    }

    async fn issue_token(&self, client_id: &str, subject: Option<String>, scope: Option<String>) -> AccessToken {
        let token = Uuid::new_v4().simple().to_string();
        let issued = IssuedToken {
            client_id: client_id.to_string(),
            subject,
            scope: scope.clone(),
            expires_at: Instant::now() + Duration::from_secs(self.token_ttl_secs),
        };
        let mut state = self.state.lock().await;
        state.tokens.retain(|_, t| t.expires_at > Instant::now());
        state.tokens.insert(token.clone(), issued);
        AccessToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl_secs,
            scope,
        }
    }

    /// Look up a bearer token. Expired and unknown tokens both yield `None`.
    pub async fn verify(&self, access_token: &str) -> Option<TokenGrant> {
        let state = self.state.lock().await;
        state
            .tokens
            .get(access_token)
            .filter(|t| t.expires_at > Instant::now())
            .map(|t| TokenGrant {
                client_id: t.client_id.clone(),
                subject: t.subject.clone(),
                scope: t.scope.clone(),
            })
    }

    async fn exchange_code(&self, req: &TokenRequest) -> Result<AccessToken, AccessError> {
        self.authenticate(&req.client_id, req.client_secret.as_deref())?;
        let code = req
            .code
            .as_deref()
            .ok_or_else(|| AccessError::invalid_request("code is required"))?;
        let issued = self
            .state
            .lock()
            .await
            .codes
            .remove(code)
            .ok_or_else(|| AccessError::invalid_grant("authorization code is invalid or already used"))?;
        if issued.expires_at <= Instant::now() {
            return Err(AccessError::invalid_grant("authorization code has expired"));
        }
        if issued.client_id != req.client_id {
            return Err(AccessError::invalid_grant("authorization code was issued to another client"));
        }
        match req.redirect_uri.as_deref() {
            Some(uri) if uri != issued.redirect_uri => {
                return Err(AccessError::invalid_grant("redirect_uri does not match"));
            }
            None if issued.explicit_redirect => {
                return Err(AccessError::invalid_request("redirect_uri is required"));
            }
            _ => {}
        }
        Ok(self
            .issue_token(&issued.client_id, Some(issued.subject), issued.scope)
            .await)
    }

    async fn client_credentials(&self, req: &TokenRequest) -> Result<AccessToken, AccessError> {
        let client = self.authenticate(&req.client_id, req.client_secret.as_deref())?;
        Self::check_scope(client, req.scope.as_deref())?;
        Ok(self.issue_token(&req.client_id, None, req.scope.clone()).await)
    }
}

#[async_trait]
impl AccessController for StaticAccessController {
    async fn authorize(&self, req: AuthorizeRequest) -> Result<AuthorizationCode, AccessError> {
        if req.response_type != "code" {
            return Err(AccessError::unsupported(
                "unsupported_response_type",
                format!("response_type `{}` is not supported", req.response_type),
            ));
        }
        let client = self.client(&req.client_id)?;
        let redirect_uri = match (&req.redirect_uri, client.redirect_uris.as_slice()) {
            (Some(uri), registered) if registered.iter().any(|r| r == uri) => uri.clone(),
            (Some(_), _) => return Err(AccessError::invalid_request("redirect_uri is not registered")),
            (None, [only]) => only.clone(),
            (None, _) => return Err(AccessError::invalid_request("redirect_uri is required")),
        };
        Self::check_scope(client, req.scope.as_deref())?;

        let code = Uuid::new_v4().simple().to_string();
        let mut state = self.state.lock().await;
        state.codes.retain(|_, c| c.expires_at > Instant::now());
        state.codes.insert(
            code.clone(),
            IssuedCode {
                client_id: req.client_id,
                redirect_uri: redirect_uri.clone(),
                explicit_redirect: req.redirect_uri.is_some(),
                scope: req.scope,
                subject: req.subject,
                expires_at: Instant::now() + CODE_TTL,
            },
        );
        tracing::debug!(client_id = %client.client_id, "authorization code issued");
        Ok(AuthorizationCode {
            code,
            redirect_uri,
            state: req.state,
        })
    }

    async fn token(&self, req: TokenRequest) -> Result<AccessToken, AccessError> {
        match req.grant_type.as_str() {
            "authorization_code" => self.exchange_code(&req).await,
            "client_credentials" => self.client_credentials(&req).await,
            other => Err(AccessError::unsupported(
                "unsupported_grant_type",
                format!("grant_type `{other}` is not supported"),
            )),
        }
    }
}
