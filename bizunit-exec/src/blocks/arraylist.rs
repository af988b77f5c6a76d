//! Nested list/map access by a key path.
//!
//! The first key names the root: a stack variable when one is declared, otherwise a block
//! storage entry. Remaining keys walk into it; list removal re-indexes the list.

use async_trait::async_trait;
use bizunit_core::{
    resolve, Block, BlockAggregator, BlockError, BlockFamily, BlockHeader, BlockKey, BlockNode,
    BlockResult, BlockStorage, Flow, FromTemplate, PathKey, PlanStorage, TemplateReader,
    TemplateWriter, Value,
};
use serde_json::{Map, Value as JsonValue};

use super::support::path_display;

pub fn family() -> BlockFamily {
    BlockFamily::new("arraylist")
        .action::<ArrayListGet>("get")
        .action::<ArrayListSet>("set")
        .action::<ArrayListRemove>("remove")
        .action::<ArrayListExists>("exists")
        .action::<ArrayListCount>("count")
}

fn not_found(key: &BlockKey, path: &[PathKey]) -> BlockError {
    key.invalid_argument("keys", format!("nothing found at `{}`", path_display(path)))
}

fn lookup(plan: &PlanStorage, storage: &BlockStorage, path: &[PathKey]) -> Option<Value> {
    let (root, rest) = path.split_first()?;
    match plan.stack_manager().lookup(&root.to_string()) {
        Some(var) => var.lookup(rest),
        None => storage.lookup(path),
    }
}

macro_rules! keyed_block {
    ($(#[$doc:meta])* $name:ident $(, $field:ident)?) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            header: BlockHeader,
            keys: BlockAggregator,
            $($field: BlockNode,)?
        }

        impl FromTemplate for $name {
            fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
                Ok(Self {
                    header,
                    keys: reader.aggregator("keys")?,
                    $($field: reader.block(stringify!($field))?,)?
                })
            }
        }

        #[async_trait]
        impl Block for $name {
            fn header(&self) -> &BlockHeader {
                &self.header
            }

            fn template(&self) -> Map<String, JsonValue> {
                TemplateWriter::new()
                    .aggregator("keys", &self.keys)
                    $(.block(stringify!($field), &self.$field))?
                    .finish()
            }

            async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
                let key = &self.header.key;
                if self.keys.is_empty() {
                    return Err(key.invalid_argument("keys", "at least one key is required"));
                }
                let mut path = Vec::with_capacity(self.keys.len());
                for node in &self.keys {
                    let value = resolve!(node.run(plan, storage).await?);
                    let segment = PathKey::from_value(&value).ok_or_else(|| {
                        key.invalid_argument(
                            "keys",
                            format!("keys must be strings or non-negative integers, got {}", value.type_name()),
                        )
                    })?;
                    path.push(segment);
                }
                self.apply(path, plan, storage).await
            }
        }
    };
}

keyed_block!(
    /// The value at the path; missing is an invalid argument.
    ArrayListGet
);

impl ArrayListGet {
    async fn apply(&self, path: Vec<PathKey>, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        lookup(plan, storage, &path)
            .map(Flow::Continue)
            .ok_or_else(|| not_found(&self.header.key, &path))
    }
}

keyed_block!(
    /// Writes `value` at the path, creating intermediate maps. A list index equal to the
    /// length appends.
    ArrayListSet,
    value
);

impl ArrayListSet {
    async fn apply(&self, path: Vec<PathKey>, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let value = resolve!(self.value.run(plan, storage).await?);
        let (root, rest) = path.split_first().ok_or_else(|| not_found(key, &path))?;
        let written = match plan.stack_manager_mut().lookup_mut(&root.to_string()) {
            Some(var) => var.insert_at(rest, value.clone()),
            None => storage.insert_at(&path, value.clone()),
        };
        written.map_err(|e| key.invalid_argument("keys", e.to_string()))?;
        Ok(Flow::Continue(value))
    }
}

keyed_block!(
    /// Removes and yields the value at the path.
    ArrayListRemove
);

impl ArrayListRemove {
    async fn apply(&self, path: Vec<PathKey>, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let (root, rest) = path.split_first().ok_or_else(|| not_found(key, &path))?;
        let removed = match plan.stack_manager_mut().lookup_mut(&root.to_string()) {
            Some(var) if rest.is_empty() => Some(std::mem::take(var)),
            Some(var) => var.remove_at(rest),
            None => storage.remove_at(&path),
        };
        removed
            .map(Flow::Continue)
            .ok_or_else(|| not_found(key, &path))
    }
}

keyed_block!(ArrayListExists);

impl ArrayListExists {
    async fn apply(&self, path: Vec<PathKey>, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::value(lookup(plan, storage, &path).is_some()))
    }
}

keyed_block!(
    /// Length of the list or map at the path.
    ArrayListCount
);

impl ArrayListCount {
    async fn apply(&self, path: Vec<PathKey>, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let len = match lookup(plan, storage, &path) {
            Some(Value::List(items)) => items.len(),
            Some(Value::Map(map)) => map.len(),
            Some(other) => {
                return Err(key.invalid_argument(
                    "keys",
                    format!("expected list or map at `{}`, got {}", path_display(&path), other.type_name()),
                ))
            }
            None => return Err(not_found(key, &path)),
        };
        Ok(Flow::value(len as i64))
    }
}
