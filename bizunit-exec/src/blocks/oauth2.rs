//! OAuth 2.0 authorization server endpoints backed by the configured access controller.
//!
//! Both blocks yield a response context rather than responding themselves, so a plan can log
//! or reshape it before handing it to `operator.response`. Protocol errors are part of that
//! context (RFC 6749 error body and status), not block errors.

use std::sync::Arc;

use async_trait::async_trait;
use bizunit_core::services::{
    AccessController, AccessError, AuthorizationCode, AuthorizeRequest, TokenRequest,
};
use bizunit_core::{
    resolve_as, Block, BlockError, BlockFamily, BlockHeader, BlockKey, BlockNode, BlockResult,
    BlockStorage, Flow, FromTemplate, HeaderMap, PlanStorage, ProtocolContext, TemplateReader,
    TemplateWriter, Value, ValueMap,
};
use serde_json::{Map, Value as JsonValue};
use url::Url;

pub fn family() -> BlockFamily {
    BlockFamily::new("oauth2")
        .action::<AuthorizeBlock>("authorize")
        .action::<TokenBlock>("token")
}

fn controller(key: &BlockKey, plan: &PlanStorage) -> Result<Arc<dyn AccessController>, BlockError> {
    plan.access()
        .ok_or_else(|| key.runtime().with_extra("reason", "no access controller configured"))
}

fn text(map: &ValueMap, name: &str) -> Option<String> {
    map.get(name)
        .and_then(Value::to_scalar_string)
        .filter(|s| !s.is_empty())
}

fn json_headers() -> HeaderMap {
    let mut header = HeaderMap::new();
    header.insert("Content-Type".into(), "application/json;charset=UTF-8".into());
    header.insert("Cache-Control".into(), "no-store".into());
    header.insert("Pragma".into(), "no-cache".into());
    header
}

fn error_context(err: &AccessError) -> ProtocolContext {
    ProtocolContext::new(json_headers(), Value::from_json(err.to_json()), Some(err.status))
}

fn redirect_location(code: &AuthorizationCode) -> Result<String, AccessError> {
    let mut url = Url::parse(&code.redirect_uri)
        .map_err(|e| AccessError::invalid_request(format!("redirect_uri: {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("code", &code.code);
        if let Some(state) = &code.state {
            pairs.append_pair("state", state);
        }
    }
    Ok(url.into())
}

/// Issues an authorization code for the signed-in account and redirects back to the client.
///
/// `request` defaults to the origin query string.
#[derive(Debug)]
pub struct AuthorizeBlock {
    header: BlockHeader,
    request: Option<BlockNode>,
}

impl FromTemplate for AuthorizeBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            request: reader.optional_block("request")?,
        })
    }
}

impl AuthorizeBlock {
    async fn authorize(
        &self,
        access: &dyn AccessController,
        params: &ValueMap,
        subject: Option<String>,
    ) -> Result<ProtocolContext, AccessError> {
        let subject = subject.ok_or_else(|| {
            AccessError::new("access_denied", "no authenticated account", 401)
        })?;
        let request = AuthorizeRequest {
            response_type: text(params, "response_type")
                .ok_or_else(|| AccessError::invalid_request("response_type is required"))?,
            client_id: text(params, "client_id")
                .ok_or_else(|| AccessError::invalid_request("client_id is required"))?,
            redirect_uri: text(params, "redirect_uri"),
            scope: text(params, "scope"),
            state: text(params, "state"),
            subject,
        };
        let code = access.authorize(request).await?;
        let mut header = HeaderMap::new();
        header.insert("Location".into(), redirect_location(&code)?);
        header.insert("Cache-Control".into(), "no-store".into());
        Ok(ProtocolContext::new(header, Value::Null, Some(302)))
    }
}

#[async_trait]
impl Block for AuthorizeBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .optional_block("request", self.request.as_ref())
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let params: ValueMap = match &self.request {
            Some(node) => resolve_as!(key, "request", node, plan, storage),
            None => plan
                .origin()
                .query
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        };
        let access = controller(key, plan)?;
        let subject = plan.account().account_id.clone();
        let context = self
            .authorize(access.as_ref(), &params, subject)
            .await
            .unwrap_or_else(|err| error_context(&err));
        Ok(Flow::value(context))
    }
}

/// Exchanges a grant for a bearer token. `request` defaults to the origin body.
#[derive(Debug)]
pub struct TokenBlock {
    header: BlockHeader,
    request: Option<BlockNode>,
}

impl FromTemplate for TokenBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            request: reader.optional_block("request")?,
        })
    }
}

async fn issue(access: &dyn AccessController, params: &ValueMap) -> Result<ProtocolContext, AccessError> {
    let request = TokenRequest {
        grant_type: text(params, "grant_type")
            .ok_or_else(|| AccessError::invalid_request("grant_type is required"))?,
        client_id: text(params, "client_id")
            .ok_or_else(|| AccessError::invalid_request("client_id is required"))?,
        client_secret: text(params, "client_secret"),
        code: text(params, "code"),
        redirect_uri: text(params, "redirect_uri"),
        scope: text(params, "scope"),
    };
    let token = access.token(request).await?;
    let body = serde_json::to_value(&token)
        .map_err(|e| AccessError::new("server_error", e.to_string(), 500))?;
    Ok(ProtocolContext::new(json_headers(), Value::from_json(body), Some(200)))
}

#[async_trait]
impl Block for TokenBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .optional_block("request", self.request.as_ref())
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let params: ValueMap = match &self.request {
            Some(node) => resolve_as!(key, "request", node, plan, storage),
            None => match &plan.origin().body {
                Value::Map(map) => map.clone(),
                Value::Null => ValueMap::new(),
                other => {
                    return Err(key.invalid_argument(
                        "request",
                        format!("origin body must be a map, got {}", other.type_name()),
                    ))
                }
            },
        };
        let access = controller(key, plan)?;
        let context = issue(access.as_ref(), &params)
            .await
            .unwrap_or_else(|err| error_context(&err));
        Ok(Flow::value(context))
    }
}
