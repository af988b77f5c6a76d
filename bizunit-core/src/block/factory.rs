use std::fmt;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use super::{Block, BlockHeader, BlockNode};
use crate::error::BlockError;
use crate::template::{BlockTemplate, ChildOutline, TemplateReader};

/// Builds one concrete block from its parsed header and template fields.
pub trait FromTemplate: Block + Sized + 'static {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError>;
}

pub type Constructor = fn(BlockHeader, &TemplateReader<'_>) -> Result<Box<dyn Block>, BlockError>;

fn construct<T: FromTemplate>(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Box<dyn Block>, BlockError> {
    Ok(Box::new(T::from_template(header, reader)?))
}

/// Dispatch manager for one block type: switches on `action`.
#[derive(Clone)]
pub struct BlockFamily {
    name: String,
    actions: IndexMap<String, Constructor>,
}

impl fmt::Debug for BlockFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockFamily")
            .field("name", &self.name)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BlockFamily {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: IndexMap::new(),
        }
    }

    pub fn action<T: FromTemplate>(mut self, action: &str) -> Self {
        self.actions.insert(action.to_string(), construct::<T>);
        self
    }

    pub fn action_with(mut self, action: &str, ctor: Constructor) -> Self {
        self.actions.insert(action.to_string(), ctor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn construct(&self, template: &BlockTemplate, factory: &BlockFactory) -> Result<BlockNode, BlockError> {
        let key = template.key();
        self.dispatch(template, &TemplateReader::new(&key, &template.template, factory))
    }

    fn dispatch(&self, template: &BlockTemplate, reader: &TemplateReader<'_>) -> Result<BlockNode, BlockError> {
        let key = reader.key();
        let ctor = self.actions.get(&template.action).ok_or_else(|| {
            key.template_error(format!(
                "unrecognized action `{}` for block type `{}`",
                template.action, self.name
            ))
        })?;
        let header = BlockHeader::new(key.clone(), template.extra.clone());
        ctor(header, reader).map(BlockNode::from_box)
    }
}

/// Registry of block families keyed by `type`, populated once at startup.
#[derive(Debug, Clone, Default)]
pub struct BlockFactory {
    families: IndexMap<String, BlockFamily>,
}

impl BlockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering a family under an existing name replaces it.
    pub fn register(&mut self, family: BlockFamily) -> &mut Self {
        self.families.insert(family.name.clone(), family);
        self
    }

    pub fn with(mut self, family: BlockFamily) -> Self {
        self.register(family);
        self
    }

    pub fn build(&self, json: &JsonValue) -> Result<BlockNode, BlockError> {
        let template = BlockTemplate::from_json(json)?;
        let family = self.families.get(&template.r#type).ok_or_else(|| {
            template
                .key()
                .template_error(format!("unknown block type `{}`", template.r#type))
        })?;
        family.construct(&template, self)
    }

    /// Run the constructor for `json` without building its children. Fields holding child
    /// blocks are recorded in `outline`.
    pub fn outline(&self, json: &JsonValue, outline: &ChildOutline) -> Result<(), BlockError> {
        let template = BlockTemplate::from_json(json)?;
        let key = template.key();
        let family = self
            .families
            .get(&template.r#type)
            .ok_or_else(|| key.template_error(format!("unknown block type `{}`", template.r#type)))?;
        let reader = TemplateReader::outlining(&key, &template.template, self, outline);
        family.dispatch(&template, &reader).map(drop)
    }

    pub fn contains(&self, r#type: &str, action: &str) -> bool {
        self.families
            .get(r#type)
            .is_some_and(|f| f.actions.contains_key(action))
    }

    pub fn families(&self) -> impl Iterator<Item = &BlockFamily> {
        self.families.values()
    }
}
