use serde_json::Value as JsonValue;

use super::factory::BlockFactory;
use super::BlockNode;
use crate::error::BlockError;

/// Ordered child blocks. Order is significant: later entries run (and merge) later.
#[derive(Debug, Default)]
pub struct BlockAggregator {
    blocks: Vec<BlockNode>,
}

impl BlockAggregator {
    pub fn new(blocks: Vec<BlockNode>) -> Self {
        Self { blocks }
    }

    pub fn from_json_list(items: &[JsonValue], factory: &BlockFactory) -> Result<Self, BlockError> {
        items
            .iter()
            .map(|item| factory.build(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    pub fn templates(&self) -> Vec<JsonValue> {
        self.blocks.iter().map(BlockNode::to_json).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BlockNode> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl<'a> IntoIterator for &'a BlockAggregator {
    type Item = &'a BlockNode;
    type IntoIter = std::slice::Iter<'a, BlockNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
