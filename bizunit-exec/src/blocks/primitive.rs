//! Constant and composite values.

use async_trait::async_trait;
use bizunit_core::{
    resolve, Block, BlockAggregator, BlockError, BlockFamily, BlockHeader, BlockNode, BlockResult,
    BlockStorage, Flow, FromTemplate, PlanStorage, TemplateReader, TemplateWriter, Value, ValueMap,
};
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

pub fn family() -> BlockFamily {
    BlockFamily::new("primitive")
        .action::<StringBlock>("string")
        .action::<IntegerBlock>("integer")
        .action::<FloatBlock>("float")
        .action::<BooleanBlock>("boolean")
        .action::<NullBlock>("null")
        .action::<LiteralBlock>("literal")
        .action::<MapBlock>("map")
        .action::<ListBlock>("list")
        .action::<ConcatBlock>("concat")
}

#[derive(Debug)]
pub struct StringBlock {
    header: BlockHeader,
    value: String,
}

impl FromTemplate for StringBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            value: reader.string("value")?,
        })
    }
}

#[async_trait]
impl Block for StringBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().string("value", &self.value).finish()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::value(self.value.as_str()))
    }
}

#[derive(Debug)]
pub struct IntegerBlock {
    header: BlockHeader,
    value: i64,
}

impl FromTemplate for IntegerBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        let value = reader
            .value("value")
            .and_then(JsonValue::as_i64)
            .ok_or_else(|| reader.key().template_error("`value` must be an integer"))?;
        Ok(Self { header, value })
    }
}

#[async_trait]
impl Block for IntegerBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .value("value", JsonValue::from(self.value))
            .finish()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::value(self.value))
    }
}

#[derive(Debug)]
pub struct FloatBlock {
    header: BlockHeader,
    value: f64,
}

impl FromTemplate for FloatBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        let value = reader
            .value("value")
            .and_then(JsonValue::as_f64)
            .ok_or_else(|| reader.key().template_error("`value` must be a number"))?;
        Ok(Self { header, value })
    }
}

#[async_trait]
impl Block for FloatBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .value("value", JsonValue::from(self.value))
            .finish()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::value(self.value))
    }
}

#[derive(Debug)]
pub struct BooleanBlock {
    header: BlockHeader,
    value: bool,
}

impl FromTemplate for BooleanBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        let value = reader
            .value("value")
            .and_then(JsonValue::as_bool)
            .ok_or_else(|| reader.key().template_error("`value` must be a boolean"))?;
        Ok(Self { header, value })
    }
}

#[async_trait]
impl Block for BooleanBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .value("value", JsonValue::Bool(self.value))
            .finish()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::value(self.value))
    }
}

#[derive(Debug)]
pub struct NullBlock {
    header: BlockHeader,
}

impl FromTemplate for NullBlock {
    fn from_template(header: BlockHeader, _reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self { header })
    }
}

#[async_trait]
impl Block for NullBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        Map::new()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::Continue(Value::Null))
    }
}

/// Any JSON value, taken as data. Nested objects are never read as blocks.
#[derive(Debug)]
pub struct LiteralBlock {
    header: BlockHeader,
    value: JsonValue,
}

impl FromTemplate for LiteralBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            value: reader.value("value").cloned().unwrap_or(JsonValue::Null),
        })
    }
}

#[async_trait]
impl Block for LiteralBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().value("value", self.value.clone()).finish()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::Continue(Value::from_json(self.value.clone())))
    }
}

#[derive(Debug)]
pub struct MapBlock {
    header: BlockHeader,
    entries: IndexMap<String, BlockNode>,
}

impl FromTemplate for MapBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            entries: reader.block_map("entries")?,
        })
    }
}

#[async_trait]
impl Block for MapBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().block_map("entries", &self.entries).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let mut map = ValueMap::with_capacity(self.entries.len());
        for (name, node) in &self.entries {
            map.insert(name.clone(), resolve!(node.run(plan, storage).await?));
        }
        Ok(Flow::value(map))
    }
}

#[derive(Debug)]
pub struct ListBlock {
    header: BlockHeader,
    items: BlockAggregator,
}

impl FromTemplate for ListBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            items: reader.aggregator("items")?,
        })
    }
}

#[async_trait]
impl Block for ListBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().aggregator("items", &self.items).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let mut items = Vec::with_capacity(self.items.len());
        for node in &self.items {
            items.push(resolve!(node.run(plan, storage).await?));
        }
        Ok(Flow::value(items))
    }
}

/// Joins scalar results into one string.
#[derive(Debug)]
pub struct ConcatBlock {
    header: BlockHeader,
    items: BlockAggregator,
    separator: Option<String>,
}

impl FromTemplate for ConcatBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            items: reader.aggregator("items")?,
            separator: reader.optional_string("separator")?,
        })
    }
}

#[async_trait]
impl Block for ConcatBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .aggregator("items", &self.items)
            .optional_string("separator", self.separator.as_deref())
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let mut parts = Vec::with_capacity(self.items.len());
        for (index, node) in self.items.iter().enumerate() {
            let value = resolve!(node.run(plan, storage).await?);
            let part = value.to_scalar_string().ok_or_else(|| {
                self.header.key.invalid_argument(
                    "items",
                    format!("item {index} must be a scalar, got {}", value.type_name()),
                )
            })?;
            parts.push(part);
        }
        Ok(Flow::value(parts.join(self.separator.as_deref().unwrap_or_default())))
    }
}
