//! The block contract and the boundary every block execution passes through.

mod aggregator;
pub mod factory;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::context::PlanResponse;
use crate::error::{BlockError, BlockKey};
use crate::storage::{BlockStorage, PlanStorage};
use crate::template::{BlockTemplate, ExtraManager};
use crate::value::Value;

pub use aggregator::BlockAggregator;
pub use factory::{BlockFactory, BlockFamily, FromTemplate};

/// What a block hands back to its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue(Value),
    /// Early termination with an author-chosen response. Every parent passes this upward
    /// unchanged; only the plan runner consumes it.
    Respond(PlanResponse),
}

impl Flow {
    pub fn value(value: impl Into<Value>) -> Self {
        Flow::Continue(value.into())
    }

    pub fn is_respond(&self) -> bool {
        matches!(self, Flow::Respond(_))
    }
}

pub type BlockResult = Result<Flow, BlockError>;

/// Unwrap a child's [`Flow`]: yields the value of `Continue`, returns `Respond` from the
/// enclosing block as-is.
#[macro_export]
macro_rules! resolve {
    ($flow:expr) => {
        match $flow {
            $crate::block::Flow::Continue(value) => value,
            respond @ $crate::block::Flow::Respond(_) => return Ok(respond),
        }
    };
}

/// Run a child block and type-check its value against the owning block's `field`.
///
/// `resolve_as!(self.header.key, "endpoint", self.endpoint, plan, storage)`
#[macro_export]
macro_rules! resolve_as {
    ($key:expr, $field:expr, $node:expr, $plan:expr, $storage:expr) => {
        $key.expect($field, $crate::resolve!($node.run($plan, $storage).await?))?
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockHeader {
    pub key: BlockKey,
    pub extra: ExtraManager,
}

impl BlockHeader {
    pub fn new(key: BlockKey, extra: ExtraManager) -> Self {
        Self { key, extra }
    }
}

/// One `(type, action)` behavior. Implementations hold only template-derived state, so a
/// built tree can be shared across concurrent executions.
#[async_trait]
pub trait Block: Send + Sync + fmt::Debug {
    fn header(&self) -> &BlockHeader;

    /// The `template` object this block was built from, with defaults filled in.
    fn template(&self) -> Map<String, JsonValue>;

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult;
}

#[derive(Debug)]
pub struct BlockNode {
    inner: Box<dyn Block>,
}

impl BlockNode {
    pub fn new<B: Block + 'static>(block: B) -> Self {
        Self {
            inner: Box::new(block),
        }
    }

    pub fn from_box(inner: Box<dyn Block>) -> Self {
        Self { inner }
    }

    /// Placeholder handed out by an outlining reader in place of a child it did not build.
    pub(crate) fn unbuilt(owner: BlockKey) -> Self {
        Self::new(Unbuilt {
            header: BlockHeader::new(owner, ExtraManager::default()),
        })
    }

    pub fn key(&self) -> &BlockKey {
        &self.inner.header().key
    }

    pub fn extra(&self) -> &ExtraManager {
        &self.inner.header().extra
    }

    pub fn template(&self) -> BlockTemplate {
        let header = self.inner.header();
        BlockTemplate {
            r#type: header.key.r#type.clone(),
            action: header.key.action.clone(),
            extra: header.extra.clone(),
            template: self.inner.template(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        self.template().to_json()
    }

    /// Execute the block. Categorized errors and `Respond` pass through untouched; any other
    /// failure is logged and re-raised as a runtime error tagged with this block's key.
    pub async fn run(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = self.key();
        tracing::trace!(run_id = %plan.run_id(), block = %key, "execute");
        match self.inner.execute(plan, storage).await {
            Ok(flow) => Ok(flow),
            Err(err) => Err(err.at_boundary(key, plan.logger())),
        }
    }
}

#[derive(Debug)]
struct Unbuilt {
    header: BlockHeader,
}

#[async_trait]
impl Block for Unbuilt {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        Map::new()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Err(self.header.key.runtime().with_extra("reason", "outlined child was never built"))
    }
}
