//! Storage drivers. Handles come from the plan storage and connect on first use; every
//! driver failure is a storage error.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bizunit_core::services::{RdbResource, RedisResource, ResourceError};
use bizunit_core::{
    resolve, resolve_as, Block, BlockAggregator, BlockError, BlockFamily, BlockHeader, BlockKey,
    BlockNode, BlockResult, BlockStorage, Flow, FromTemplate, PlanStorage, TemplateReader,
    TemplateWriter, Value,
};
use serde_json::{Map, Value as JsonValue};

pub fn family() -> BlockFamily {
    BlockFamily::new("driver")
        .action::<RdbQuery>("rdb-query")
        .action::<RdbExecute>("rdb-execute")
        .action::<RedisGet>("redis-get")
        .action::<RedisSet>("redis-set")
        .action::<RedisExist>("redis-exist")
        .action::<RedisDel>("redis-del")
}

fn storage_error(key: &BlockKey) -> impl Fn(ResourceError) -> BlockError + '_ {
    move |err| key.storage(err.to_string())
}

fn rdb(key: &BlockKey, plan: &PlanStorage) -> Result<Arc<dyn RdbResource>, BlockError> {
    plan.rdb()
        .ok_or_else(|| storage_error(key)(ResourceError::NotConfigured("rdb")))
}

fn redis(key: &BlockKey, plan: &PlanStorage) -> Result<Arc<dyn RedisResource>, BlockError> {
    plan.redis()
        .ok_or_else(|| storage_error(key)(ResourceError::NotConfigured("redis")))
}

/// Statement plus positional parameters, shared by both relational actions.
#[derive(Debug)]
struct Statement {
    sql: BlockNode,
    params: BlockAggregator,
}

impl Statement {
    fn read(reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            sql: reader.block("sql")?,
            params: reader.aggregator("params")?,
        })
    }

    fn write(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("sql", &self.sql)
            .aggregator("params", &self.params)
            .finish()
    }
}

/// Resolves a statement's sql and params, passing a `Respond` from any child upward.
macro_rules! resolve_statement {
    ($key:expr, $stmt:expr, $plan:expr, $storage:expr) => {{
        let sql: String = resolve_as!($key, "sql", $stmt.sql, $plan, $storage);
        let mut params = Vec::with_capacity($stmt.params.len());
        for node in &$stmt.params {
            params.push(resolve!(node.run($plan, $storage).await?).to_json());
        }
        (sql, params)
    }};
}

/// Rows as a list of maps, columns in select order.
#[derive(Debug)]
pub struct RdbQuery {
    header: BlockHeader,
    statement: Statement,
}

impl FromTemplate for RdbQuery {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            statement: Statement::read(reader)?,
        })
    }
}

#[async_trait]
impl Block for RdbQuery {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        self.statement.write()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let (sql, params) = resolve_statement!(key, self.statement, plan, storage);
        let rdb = rdb(key, plan)?;
        let started = Instant::now();
        let rows = rdb.query(&sql, &params).await.map_err(storage_error(key))?;
        plan.logger().query(&sql, &params, started.elapsed());
        Ok(Flow::value(
            rows.into_iter().map(Value::from_json).collect::<Vec<_>>(),
        ))
    }
}

/// Rows affected.
#[derive(Debug)]
pub struct RdbExecute {
    header: BlockHeader,
    statement: Statement,
}

impl FromTemplate for RdbExecute {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            statement: Statement::read(reader)?,
        })
    }
}

#[async_trait]
impl Block for RdbExecute {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        self.statement.write()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let (sql, params) = resolve_statement!(key, self.statement, plan, storage);
        let rdb = rdb(key, plan)?;
        let started = Instant::now();
        let affected = rdb.execute(&sql, &params).await.map_err(storage_error(key))?;
        plan.logger().query(&sql, &params, started.elapsed());
        Ok(Flow::value(i64::try_from(affected).unwrap_or(i64::MAX)))
    }
}

/// The stored string, or null for a missing key.
#[derive(Debug)]
pub struct RedisGet {
    header: BlockHeader,
    key: BlockNode,
}

impl FromTemplate for RedisGet {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            key: reader.block("key")?,
        })
    }
}

#[async_trait]
impl Block for RedisGet {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().block("key", &self.key).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let name: String = resolve_as!(key, "key", self.key, plan, storage);
        let found = redis(key, plan)?
            .get_data(&name)
            .await
            .map_err(storage_error(key))?;
        Ok(Flow::Continue(found.map(Value::String).unwrap_or(Value::Null)))
    }
}

/// Stores strings as-is and anything else JSON-encoded. `ttl` is in seconds; absent or zero
/// means no expiry.
#[derive(Debug)]
pub struct RedisSet {
    header: BlockHeader,
    key: BlockNode,
    value: BlockNode,
    ttl: Option<BlockNode>,
}

impl FromTemplate for RedisSet {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            key: reader.block("key")?,
            value: reader.block("value")?,
            ttl: reader.optional_block("ttl")?,
        })
    }
}

#[async_trait]
impl Block for RedisSet {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("key", &self.key)
            .block("value", &self.value)
            .optional_block("ttl", self.ttl.as_ref())
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let name: String = resolve_as!(key, "key", self.key, plan, storage);
        let value = resolve!(self.value.run(plan, storage).await?);
        let ttl: i64 = match &self.ttl {
            Some(node) => resolve_as!(key, "ttl", node, plan, storage),
            None => 0,
        };
        let ttl = u64::try_from(ttl)
            .map_err(|_| key.invalid_argument("ttl", format!("must not be negative, got {ttl}")))?;
        let text = match &value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string(&other.to_json())?,
        };
        redis(key, plan)?
            .set_data_with_expire(&name, &text, ttl)
            .await
            .map_err(storage_error(key))?;
        Ok(Flow::Continue(value))
    }
}

#[derive(Debug)]
pub struct RedisExist {
    header: BlockHeader,
    key: BlockNode,
}

impl FromTemplate for RedisExist {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            key: reader.block("key")?,
        })
    }
}

#[async_trait]
impl Block for RedisExist {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().block("key", &self.key).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let name: String = resolve_as!(key, "key", self.key, plan, storage);
        let exists = redis(key, plan)?
            .exist(&name)
            .await
            .map_err(storage_error(key))?;
        Ok(Flow::value(exists))
    }
}

/// Number of keys removed.
#[derive(Debug)]
pub struct RedisDel {
    header: BlockHeader,
    key: BlockNode,
}

impl FromTemplate for RedisDel {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            key: reader.block("key")?,
        })
    }
}

#[async_trait]
impl Block for RedisDel {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().block("key", &self.key).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let name: String = resolve_as!(key, "key", self.key, plan, storage);
        let removed = redis(key, plan)?
            .del(&name)
            .await
            .map_err(storage_error(key))?;
        Ok(Flow::value(i64::try_from(removed).unwrap_or(i64::MAX)))
    }
}
