//! The on-the-wire block shape and the helpers blocks use to read and write it.
//!
//! Every block serializes as `{"type", "action", "extra", "template"}`. A block's
//! `from_template` reads its fields through [`TemplateReader`] and its `template()` writes them
//! back through [`TemplateWriter`], which keeps the two directions symmetric.

mod extra;

use std::cell::RefCell;

use indexmap::IndexMap;
use serde_json::{json, Map, Value as JsonValue};

use crate::block::factory::BlockFactory;
use crate::block::{BlockAggregator, BlockNode};
use crate::error::{BlockError, BlockKey};

pub use extra::ExtraManager;

#[derive(Debug, Clone, PartialEq)]
pub struct BlockTemplate {
    pub r#type: String,
    pub action: String,
    pub extra: ExtraManager,
    pub template: Map<String, JsonValue>,
}

impl BlockTemplate {
    pub fn from_json(json: &JsonValue) -> Result<Self, BlockError> {
        let obj = json.as_object().ok_or_else(|| {
            BlockError::template(format!(
                "block template must be an object, got {}",
                json_type_name(json)
            ))
        })?;
        let r#type = obj
            .get("type")
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BlockError::template("block template is missing `type`"))?
            .to_string();
        let action = obj
            .get("action")
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                BlockError::template(format!("block template of type `{type}` is missing `action`"))
            })?
            .to_string();
        let key = BlockKey::new(&r#type, &action);
        let extra = ExtraManager::from_json(obj.get("extra"))
            .map_err(|_| key.template_error("`extra` must be an object"))?;
        let template = match obj.get("template") {
            None | Some(JsonValue::Null) => Map::new(),
            Some(JsonValue::Object(map)) => map.clone(),
            Some(_) => return Err(key.template_error("`template` must be an object")),
        };
        Ok(Self {
            r#type,
            action,
            extra,
            template,
        })
    }

    pub fn key(&self) -> BlockKey {
        BlockKey::new(&self.r#type, &self.action)
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "type": self.r#type,
            "action": self.action,
            "extra": self.extra.to_json(),
            "template": JsonValue::Object(self.template.clone()),
        })
    }
}

pub(crate) fn json_type_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// How a template field holds child blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildShape {
    Single,
    List,
    Map,
}

/// A child-block field seen by an outlining [`TemplateReader`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChildField {
    /// Path below the owning block's `template`, e.g. `entries` or `responses[0].template.body`.
    pub path: String,
    pub shape: ChildShape,
    pub raw: JsonValue,
}

/// Child fields collected while a constructor runs without building its children.
#[derive(Debug, Default)]
pub struct ChildOutline {
    fields: RefCell<Vec<ChildField>>,
}

impl ChildOutline {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, path: String, shape: ChildShape, raw: &JsonValue) {
        self.fields.borrow_mut().push(ChildField {
            path,
            shape,
            raw: raw.clone(),
        });
    }

    pub fn into_fields(self) -> Vec<ChildField> {
        self.fields.into_inner()
    }
}

/// Reads a block's `template` object, building child blocks through the factory.
///
/// Shape errors are reported against the owning block's key; errors inside a child template
/// keep the child's own locator. An outlining reader records child fields instead of building
/// them, so a constructor reveals where its children live without recursing.
pub struct TemplateReader<'a> {
    key: &'a BlockKey,
    fields: &'a Map<String, JsonValue>,
    factory: &'a BlockFactory,
    outline: Option<&'a ChildOutline>,
    prefix: String,
}

impl<'a> TemplateReader<'a> {
    pub fn new(key: &'a BlockKey, fields: &'a Map<String, JsonValue>, factory: &'a BlockFactory) -> Self {
        Self {
            key,
            fields,
            factory,
            outline: None,
            prefix: String::new(),
        }
    }

    pub fn outlining(
        key: &'a BlockKey,
        fields: &'a Map<String, JsonValue>,
        factory: &'a BlockFactory,
        outline: &'a ChildOutline,
    ) -> Self {
        Self {
            outline: Some(outline),
            ..Self::new(key, fields, factory)
        }
    }

    /// A reader for a template embedded under `field` (e.g. `responses[0].template`) that is
    /// parsed by its owner rather than the factory. Shares this reader's mode.
    pub fn nested<'b>(
        &'b self,
        field: &str,
        key: &'b BlockKey,
        fields: &'b Map<String, JsonValue>,
    ) -> TemplateReader<'b> {
        TemplateReader {
            key,
            fields,
            factory: self.factory,
            outline: self.outline,
            prefix: self.path(field),
        }
    }

    pub fn key(&self) -> &BlockKey {
        self.key
    }

    pub fn factory(&self) -> &BlockFactory {
        self.factory
    }

    fn present(&self, name: &str) -> Option<&'a JsonValue> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    fn path(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.prefix)
        }
    }

    fn child(&self, name: &str, raw: &JsonValue) -> Result<BlockNode, BlockError> {
        match self.outline {
            Some(outline) => {
                outline.record(self.path(name), ChildShape::Single, raw);
                Ok(BlockNode::unbuilt(self.key.clone()))
            }
            None => self.factory.build(raw),
        }
    }

    pub fn block(&self, name: &str) -> Result<BlockNode, BlockError> {
        let raw = self
            .present(name)
            .ok_or_else(|| self.key.template_error(format!("missing required block `{name}`")))?;
        self.child(name, raw)
    }

    pub fn optional_block(&self, name: &str) -> Result<Option<BlockNode>, BlockError> {
        self.present(name).map(|raw| self.child(name, raw)).transpose()
    }

    pub fn aggregator(&self, name: &str) -> Result<BlockAggregator, BlockError> {
        match (self.present(name), self.outline) {
            (None, _) => Ok(BlockAggregator::default()),
            (Some(raw @ JsonValue::Array(_)), Some(outline)) => {
                outline.record(self.path(name), ChildShape::List, raw);
                Ok(BlockAggregator::default())
            }
            (Some(JsonValue::Array(items)), None) => BlockAggregator::from_json_list(items, self.factory),
            (Some(other), _) => Err(self.key.template_error(format!(
                "`{name}` must be a list of blocks, got {}",
                json_type_name(other)
            ))),
        }
    }

    pub fn block_map(&self, name: &str) -> Result<IndexMap<String, BlockNode>, BlockError> {
        match (self.present(name), self.outline) {
            (None, _) => Ok(IndexMap::new()),
            (Some(raw @ JsonValue::Object(_)), Some(outline)) => {
                outline.record(self.path(name), ChildShape::Map, raw);
                Ok(IndexMap::new())
            }
            (Some(JsonValue::Object(entries)), None) => entries
                .iter()
                .map(|(k, raw)| Ok((k.clone(), self.factory.build(raw)?)))
                .collect(),
            (Some(other), _) => Err(self.key.template_error(format!(
                "`{name}` must be an object of blocks, got {}",
                json_type_name(other)
            ))),
        }
    }

    pub fn string(&self, name: &str) -> Result<String, BlockError> {
        self.optional_string(name)?
            .ok_or_else(|| self.key.template_error(format!("missing required string `{name}`")))
    }

    pub fn optional_string(&self, name: &str) -> Result<Option<String>, BlockError> {
        match self.present(name) {
            None => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.key.template_error(format!(
                "`{name}` must be a string, got {}",
                json_type_name(other)
            ))),
        }
    }

    pub fn strings(&self, name: &str) -> Result<Vec<String>, BlockError> {
        match self.present(name) {
            None => Ok(Vec::new()),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        self.key
                            .template_error(format!("`{name}` must contain only strings"))
                    })
                })
                .collect(),
            Some(other) => Err(self.key.template_error(format!(
                "`{name}` must be a list of strings, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// An HTTP status code or null.
    pub fn optional_status(&self, name: &str) -> Result<Option<u16>, BlockError> {
        match self.present(name) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .filter(|s| (100..=599).contains(s))
                .map(|s| Some(s as u16))
                .ok_or_else(|| {
                    self.key
                        .template_error(format!("`{name}` must be an HTTP status code or null"))
                }),
        }
    }

    /// Raw JSON for literal fields.
    pub fn value(&self, name: &str) -> Option<&'a JsonValue> {
        self.fields.get(name)
    }
}

/// Builds a block's `template` object; the mirror image of [`TemplateReader`].
#[derive(Debug, Default)]
pub struct TemplateWriter {
    fields: Map<String, JsonValue>,
}

impl TemplateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(mut self, name: &str, block: &BlockNode) -> Self {
        self.fields.insert(name.to_string(), block.to_json());
        self
    }

    pub fn optional_block(mut self, name: &str, block: Option<&BlockNode>) -> Self {
        if let Some(block) = block {
            self.fields.insert(name.to_string(), block.to_json());
        }
        self
    }

    pub fn aggregator(mut self, name: &str, blocks: &BlockAggregator) -> Self {
        self.fields
            .insert(name.to_string(), JsonValue::Array(blocks.templates()));
        self
    }

    pub fn block_map(mut self, name: &str, blocks: &IndexMap<String, BlockNode>) -> Self {
        let entries = blocks
            .iter()
            .map(|(k, b)| (k.clone(), b.to_json()))
            .collect::<Map<String, JsonValue>>();
        self.fields.insert(name.to_string(), JsonValue::Object(entries));
        self
    }

    pub fn string(mut self, name: &str, value: &str) -> Self {
        self.fields
            .insert(name.to_string(), JsonValue::String(value.to_string()));
        self
    }

    pub fn optional_string(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.fields
                .insert(name.to_string(), JsonValue::String(value.to_string()));
        }
        self
    }

    pub fn strings(mut self, name: &str, values: &[String]) -> Self {
        self.fields.insert(name.to_string(), json!(values));
        self
    }

    /// Always written; `null` marks the wildcard.
    pub fn status(mut self, name: &str, status: Option<u16>) -> Self {
        self.fields.insert(name.to_string(), json!(status));
        self
    }

    pub fn value(mut self, name: &str, value: JsonValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn finish(self) -> Map<String, JsonValue> {
        self.fields
    }
}
