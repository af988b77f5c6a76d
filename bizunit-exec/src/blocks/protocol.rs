//! Protocol units. Each resolves its inputs, hands them to an executor and yields the
//! `(request, response)` exchange.

use async_trait::async_trait;
use bizunit_core::{
    resolve, resolve_as, Block, BlockAggregator, BlockError, BlockFamily, BlockHeader, BlockNode,
    BlockResult, BlockStorage, Flow, FromTemplate, HeaderMap, PlanStorage, TemplateReader,
    TemplateWriter, Value, ValueMap,
};
use serde_json::{Map, Value as JsonValue};

use super::support::header_map;
use crate::executor::{HttpExecutor, SoapExecutor};

pub fn family() -> BlockFamily {
    BlockFamily::new("protocol")
        .action::<HttpBlock>("http")
        .action::<SoapBlock>("soap")
}

/// Option blocks each yield a map; later keys overwrite earlier ones.
macro_rules! merge_options {
    ($key:expr, $options:expr, $plan:expr, $storage:expr) => {{
        let mut merged = ValueMap::new();
        for node in $options {
            let map: ValueMap = resolve_as!($key, "options", node, $plan, $storage);
            merged.extend(map);
        }
        merged
    }};
}

/// Resolves an optional header child; absent means no headers.
macro_rules! resolve_headers {
    ($key:expr, $node:expr, $plan:expr, $storage:expr) => {
        match $node {
            Some(node) => header_map($key, "header", resolve!(node.run($plan, $storage).await?))?,
            None => HeaderMap::new(),
        }
    };
}

#[derive(Debug)]
pub struct HttpBlock {
    header: BlockHeader,
    method: BlockNode,
    endpoint: BlockNode,
    headers: Option<BlockNode>,
    body: Option<BlockNode>,
    options: BlockAggregator,
}

impl FromTemplate for HttpBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            method: reader.block("method")?,
            endpoint: reader.block("endpoint")?,
            headers: reader.optional_block("header")?,
            body: reader.optional_block("body")?,
            options: reader.aggregator("options")?,
        })
    }
}

#[async_trait]
impl Block for HttpBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("method", &self.method)
            .block("endpoint", &self.endpoint)
            .optional_block("header", self.headers.as_ref())
            .optional_block("body", self.body.as_ref())
            .aggregator("options", &self.options)
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let method: String = resolve_as!(key, "method", self.method, plan, storage);
        let endpoint: String = resolve_as!(key, "endpoint", self.endpoint, plan, storage);
        let headers = resolve_headers!(key, &self.headers, plan, storage);
        let body = match &self.body {
            Some(node) => resolve!(node.run(plan, storage).await?),
            None => Value::Null,
        };
        let options = merge_options!(key, &self.options, plan, storage);

        let exchange = HttpExecutor::new(plan.http(), &plan.config().transport, plan.config().app_env)
            .method(method)
            .endpoint(endpoint)
            .headers(headers)
            .body(body)
            .options(options)
            .execute(plan.logger())
            .await
            .map_err(|err| err.into_block_error(key))?;
        Ok(Flow::value(exchange.into_exchange()))
    }
}

#[derive(Debug)]
pub struct SoapBlock {
    header: BlockHeader,
    endpoint: BlockNode,
    soap_action: Option<BlockNode>,
    headers: Option<BlockNode>,
    payload: Option<BlockNode>,
    options: BlockAggregator,
}

impl FromTemplate for SoapBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            endpoint: reader.block("endpoint")?,
            soap_action: reader.optional_block("soapAction")?,
            headers: reader.optional_block("header")?,
            payload: reader.optional_block("payload")?,
            options: reader.aggregator("options")?,
        })
    }
}

#[async_trait]
impl Block for SoapBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("endpoint", &self.endpoint)
            .optional_block("soapAction", self.soap_action.as_ref())
            .optional_block("header", self.headers.as_ref())
            .optional_block("payload", self.payload.as_ref())
            .aggregator("options", &self.options)
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let endpoint: String = resolve_as!(key, "endpoint", self.endpoint, plan, storage);
        let action = match &self.soap_action {
            Some(node) => {
                let action: String = resolve_as!(key, "soapAction", node, plan, storage);
                Some(action)
            }
            None => None,
        };
        let headers = resolve_headers!(key, &self.headers, plan, storage);
        let payload = match &self.payload {
            Some(node) => resolve!(node.run(plan, storage).await?),
            None => Value::Null,
        };
        let options = merge_options!(key, &self.options, plan, storage);

        let exchange = SoapExecutor::new(plan.http(), &plan.config().transport, plan.config().app_env)
            .endpoint(endpoint)
            .action(action)
            .headers(headers)
            .payload(payload)
            .options(options)
            .execute(plan.logger())
            .await
            .map_err(|err| err.into_block_error(key))?;
        Ok(Flow::value(exchange.into_exchange()))
    }
}
