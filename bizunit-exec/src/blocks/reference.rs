//! Reads from the per-execution state. A missing source is an invalid argument; a path that
//! leads nowhere inside an existing source yields null.

use async_trait::async_trait;
use bizunit_core::value::PathKey;
use bizunit_core::{
    Block, BlockError, BlockFamily, BlockHeader, BlockResult, BlockStorage, Flow, FromTemplate,
    PlanStorage, TemplateReader, TemplateWriter, Value,
};
use serde_json::{Map, Value as JsonValue};

use super::support::{literal_path, path_json};

pub fn family() -> BlockFamily {
    BlockFamily::new("reference")
        .action::<OperatorReference>("operator")
        .action::<BlockReference>("block")
        .action::<VariableReference>("variable")
        .action::<OriginReference>("origin")
        .action::<MetaReference>("meta")
}

fn walk(source: &Value, path: &[PathKey]) -> Value {
    source.lookup(path).unwrap_or(Value::Null)
}

/// Output of an operator, by id.
#[derive(Debug)]
pub struct OperatorReference {
    header: BlockHeader,
    id: String,
    path: Vec<PathKey>,
}

impl FromTemplate for OperatorReference {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            id: reader.string("id")?,
            path: literal_path(reader, "path")?,
        })
    }
}

#[async_trait]
impl Block for OperatorReference {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .string("id", &self.id)
            .value("path", path_json(&self.path))
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        let source = plan.operator_storage(&self.id).ok_or_else(|| {
            self.header
                .key
                .invalid_argument("id", format!("no operator output registered as `{}`", self.id))
        })?;
        Ok(Flow::Continue(walk(source, &self.path)))
    }
}

/// An entry of block storage, by name.
#[derive(Debug)]
pub struct BlockReference {
    header: BlockHeader,
    name: String,
    path: Vec<PathKey>,
}

impl FromTemplate for BlockReference {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            name: reader.string("name")?,
            path: literal_path(reader, "path")?,
        })
    }
}

#[async_trait]
impl Block for BlockReference {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .string("name", &self.name)
            .value("path", path_json(&self.path))
            .finish()
    }

    async fn execute(&self, _plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let source = storage.get(&self.name).ok_or_else(|| {
            self.header
                .key
                .invalid_argument("name", format!("no entry `{}` in block storage", self.name))
        })?;
        Ok(Flow::Continue(walk(source, &self.path)))
    }
}

/// A stack variable, searched from the innermost frame outwards.
#[derive(Debug)]
pub struct VariableReference {
    header: BlockHeader,
    name: String,
    path: Vec<PathKey>,
}

impl FromTemplate for VariableReference {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            name: reader.string("name")?,
            path: literal_path(reader, "path")?,
        })
    }
}

#[async_trait]
impl Block for VariableReference {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .string("name", &self.name)
            .value("path", path_json(&self.path))
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        let source = plan.stack_manager().lookup(&self.name).ok_or_else(|| {
            self.header
                .key
                .invalid_argument("name", format!("variable `{}` is not declared", self.name))
        })?;
        Ok(Flow::Continue(walk(source, &self.path)))
    }
}

/// The inbound request: `method`, `path`, `query`, `header`, `body`.
#[derive(Debug)]
pub struct OriginReference {
    header: BlockHeader,
    path: Vec<PathKey>,
}

impl FromTemplate for OriginReference {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            path: literal_path(reader, "path")?,
        })
    }
}

#[async_trait]
impl Block for OriginReference {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().value("path", path_json(&self.path)).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::Continue(walk(&plan.origin().to_value(), &self.path)))
    }
}

/// Execution metadata: `runId`, `env`, `transaction`, `account`.
#[derive(Debug)]
pub struct MetaReference {
    header: BlockHeader,
    path: Vec<PathKey>,
}

impl FromTemplate for MetaReference {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            path: literal_path(reader, "path")?,
        })
    }
}

#[async_trait]
impl Block for MetaReference {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().value("path", path_json(&self.path)).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::Continue(walk(&plan.meta(), &self.path)))
    }
}
