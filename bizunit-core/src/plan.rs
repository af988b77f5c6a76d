use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::block::{BlockAggregator, BlockFactory};
use crate::error::BlockError;

/// A plan as stored and edited: root block templates plus identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub blocks: Vec<JsonValue>,
}

/// A plan with its block tree built. Immutable and reusable across executions.
#[derive(Debug)]
pub struct Plan {
    name: String,
    description: Option<String>,
    blocks: BlockAggregator,
}

impl Plan {
    pub fn load(document: &PlanDocument, factory: &BlockFactory) -> Result<Self, BlockError> {
        Ok(Self {
            name: document.name.clone(),
            description: document.description.clone(),
            blocks: BlockAggregator::from_json_list(&document.blocks, factory)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn blocks(&self) -> &BlockAggregator {
        &self.blocks
    }

    /// Re-serialize the live tree.
    pub fn document(&self) -> PlanDocument {
        PlanDocument {
            name: self.name.clone(),
            description: self.description.clone(),
            blocks: self.blocks.templates(),
        }
    }
}
