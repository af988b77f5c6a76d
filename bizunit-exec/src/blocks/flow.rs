//! Sequencing and variables.

use async_trait::async_trait;
use bizunit_core::{
    resolve, Block, BlockAggregator, BlockError, BlockFamily, BlockHeader, BlockNode, BlockResult,
    BlockStorage, Flow, FromTemplate, PlanStorage, TemplateReader, TemplateWriter, Value,
};
use serde_json::{Map, Value as JsonValue};

pub fn family() -> BlockFamily {
    BlockFamily::new("flow")
        .action::<SequenceBlock>("sequence")
        .action::<ScopeBlock>("scope")
        .action::<LetBlock>("let")
        .action::<AssignBlock>("assign")
        .action::<StoreBlock>("store")
}

/// Runs `blocks` in order and yields the last value (null when empty).
pub(crate) async fn run_sequence(
    blocks: &BlockAggregator,
    plan: &mut PlanStorage,
    storage: &mut BlockStorage,
) -> BlockResult {
    let mut last = Value::Null;
    for node in blocks {
        last = resolve!(node.run(plan, storage).await?);
    }
    Ok(Flow::Continue(last))
}

#[derive(Debug)]
pub struct SequenceBlock {
    header: BlockHeader,
    blocks: BlockAggregator,
}

impl FromTemplate for SequenceBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            blocks: reader.aggregator("blocks")?,
        })
    }
}

#[async_trait]
impl Block for SequenceBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().aggregator("blocks", &self.blocks).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        run_sequence(&self.blocks, plan, storage).await
    }
}

/// A sequence with its own variable frame. The frame is dropped on every exit path.
#[derive(Debug)]
pub struct ScopeBlock {
    header: BlockHeader,
    blocks: BlockAggregator,
}

impl FromTemplate for ScopeBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            blocks: reader.aggregator("blocks")?,
        })
    }
}

#[async_trait]
impl Block for ScopeBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().aggregator("blocks", &self.blocks).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        plan.stack_manager_mut().push_frame();
        let outcome = run_sequence(&self.blocks, plan, storage).await;
        plan.stack_manager_mut().pop_frame();
        outcome
    }
}

/// Declares a variable in the innermost frame.
#[derive(Debug)]
pub struct LetBlock {
    header: BlockHeader,
    name: String,
    value: BlockNode,
}

impl FromTemplate for LetBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            name: reader.string("name")?,
            value: reader.block("value")?,
        })
    }
}

#[async_trait]
impl Block for LetBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .string("name", &self.name)
            .block("value", &self.value)
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let value = resolve!(self.value.run(plan, storage).await?);
        plan.stack_manager_mut().set(self.name.clone(), value.clone());
        Ok(Flow::Continue(value))
    }
}

/// Overwrites the nearest declaration of a variable.
#[derive(Debug)]
pub struct AssignBlock {
    header: BlockHeader,
    name: String,
    value: BlockNode,
}

impl FromTemplate for AssignBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            name: reader.string("name")?,
            value: reader.block("value")?,
        })
    }
}

#[async_trait]
impl Block for AssignBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .string("name", &self.name)
            .block("value", &self.value)
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let value = resolve!(self.value.run(plan, storage).await?);
        plan.stack_manager_mut().assign(&self.name, value.clone());
        Ok(Flow::Continue(value))
    }
}

/// Writes a value into block storage under `name`.
#[derive(Debug)]
pub struct StoreBlock {
    header: BlockHeader,
    name: String,
    value: BlockNode,
}

impl FromTemplate for StoreBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            name: reader.string("name")?,
            value: reader.block("value")?,
        })
    }
}

#[async_trait]
impl Block for StoreBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .string("name", &self.name)
            .block("value", &self.value)
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let value = resolve!(self.value.run(plan, storage).await?);
        storage.insert(self.name.clone(), value.clone());
        Ok(Flow::Continue(value))
    }
}
