//! Minimal blocks for exercising the contract without the leaf catalog.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bizunit_core::services::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts};
use bizunit_core::{
    resolve, AccountManager, Block, BlockAggregator, BlockError, BlockFactory, BlockFamily,
    BlockHeader, BlockNode, BlockResult, BlockStorage, Flow, FromTemplate, OriginRequest,
    PlanResponse, PlanServices, PlanStorage, RuntimeConfig, TemplateReader, TemplateWriter, Value,
    ValueMap,
};
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

pub struct NoHttp;

#[async_trait]
impl HttpClient for NoHttp {
    async fn send(
        &self,
        _req: HttpRequestParts,
        _timeout: Duration,
        _max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        Err(HttpError::Other("network disabled in tests".to_string()))
    }
}

pub fn plan_storage() -> PlanStorage {
    let services = PlanServices::new(Arc::new(RuntimeConfig::default()), Arc::new(NoHttp));
    PlanStorage::new(services, OriginRequest::default(), AccountManager::anonymous())
}

/// `test.value`: returns its literal `value`.
#[derive(Debug)]
pub struct ValueBlock {
    header: BlockHeader,
    value: JsonValue,
}

impl FromTemplate for ValueBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            value: reader.value("value").cloned().unwrap_or(JsonValue::Null),
        })
    }
}

#[async_trait]
impl Block for ValueBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().value("value", self.value.clone()).finish()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::value(Value::from_json(self.value.clone())))
    }
}

/// `test.upper`: requires its `input` child to produce a string.
#[derive(Debug)]
pub struct UpperBlock {
    header: BlockHeader,
    input: BlockNode,
}

impl FromTemplate for UpperBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            input: reader.block("input")?,
        })
    }
}

#[async_trait]
impl Block for UpperBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().block("input", &self.input).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let raw = resolve!(self.input.run(plan, storage).await?);
        let s: String = self.header.key.expect("input", raw)?;
        Ok(Flow::value(s.to_uppercase()))
    }
}

/// `test.seq`: runs `blocks` in order and returns the last value.
#[derive(Debug)]
pub struct SeqBlock {
    header: BlockHeader,
    blocks: BlockAggregator,
}

impl FromTemplate for SeqBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            blocks: reader.aggregator("blocks")?,
        })
    }
}

#[async_trait]
impl Block for SeqBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().aggregator("blocks", &self.blocks).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let mut last = Value::Null;
        for block in &self.blocks {
            last = resolve!(block.run(plan, storage).await?);
        }
        Ok(Flow::Continue(last))
    }
}

/// `test.explode`: fails with an uncategorized error.
#[derive(Debug)]
pub struct ExplodeBlock {
    header: BlockHeader,
}

impl FromTemplate for ExplodeBlock {
    fn from_template(header: BlockHeader, _reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self { header })
    }
}

#[async_trait]
impl Block for ExplodeBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        Map::new()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        let n: u8 = serde_json::from_str("\"not a number\"")?;
        Ok(Flow::value(i64::from(n)))
    }
}

/// `test.stop`: terminates with a 418.
#[derive(Debug)]
pub struct StopBlock {
    header: BlockHeader,
}

impl FromTemplate for StopBlock {
    fn from_template(header: BlockHeader, _reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self { header })
    }
}

#[async_trait]
impl Block for StopBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        Map::new()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::Respond(PlanResponse::new(418, Default::default(), Value::from("teapot"))))
    }
}

/// `operator.request` stand-in carrying only an `id`.
#[derive(Debug)]
pub struct IdBlock {
    header: BlockHeader,
    id: String,
}

impl FromTemplate for IdBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            id: reader.string("id")?,
        })
    }
}

#[async_trait]
impl Block for IdBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().string("id", &self.id).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        plan.add_operator_storage(self.id.clone(), Value::Null);
        Ok(Flow::value(Value::Null))
    }
}

/// `test.record`: a map of named child blocks.
#[derive(Debug)]
pub struct RecordBlock {
    header: BlockHeader,
    fields: IndexMap<String, BlockNode>,
}

impl FromTemplate for RecordBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            fields: reader.block_map("fields")?,
        })
    }
}

#[async_trait]
impl Block for RecordBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().block_map("fields", &self.fields).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let mut map = ValueMap::new();
        for (name, node) in &self.fields {
            map.insert(name.clone(), resolve!(node.run(plan, storage).await?));
        }
        Ok(Flow::value(Value::Map(map)))
    }
}

pub fn factory() -> BlockFactory {
    BlockFactory::new()
        .with(
            BlockFamily::new("test")
                .action::<ValueBlock>("value")
                .action::<UpperBlock>("upper")
                .action::<SeqBlock>("seq")
                .action::<ExplodeBlock>("explode")
                .action::<StopBlock>("stop")
                .action::<RecordBlock>("record"),
        )
        .with(BlockFamily::new("operator").action::<IdBlock>("request"))
}
