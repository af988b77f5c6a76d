use std::fmt;

use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;

use crate::logger::PlanLogger;

/// Author-supplied diagnostic data attached to a categorized failure.
pub type ExtraData = Map<String, JsonValue>;

/// The `(type, action)` pair that locates a block inside a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub r#type: String,
    pub action: String,
}

impl BlockKey {
    pub fn new(r#type: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            action: action.into(),
        }
    }

    pub fn template_error(&self, message: impl Into<String>) -> BlockError {
        BlockError::Template {
            key: Some(self.clone()),
            message: message.into(),
            extra: ExtraData::new(),
        }
    }

    pub fn invalid_argument(&self, field: impl Into<String>, message: impl Into<String>) -> BlockError {
        BlockError::InvalidArgument {
            key: self.clone(),
            field: field.into(),
            message: message.into(),
            extra: ExtraData::new(),
        }
    }

    pub fn transfer(&self, message: impl Into<String>) -> BlockError {
        BlockError::Transfer {
            key: self.clone(),
            message: message.into(),
            extra: ExtraData::new(),
        }
    }

    pub fn storage(&self, message: impl Into<String>) -> BlockError {
        BlockError::Storage {
            key: self.clone(),
            message: message.into(),
            extra: ExtraData::new(),
        }
    }

    pub fn runtime(&self) -> BlockError {
        BlockError::Runtime {
            key: self.clone(),
            extra: ExtraData::new(),
        }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.r#type, self.action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Template,
    InvalidArgument,
    Transfer,
    Storage,
    Runtime,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Template => "template",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Transfer => "transfer",
            ErrorKind::Storage => "storage",
            ErrorKind::Runtime => "runtime",
        }
    }
}

/// Failure taxonomy shared by every block.
///
/// All variants except `Foreign` are categorized and carry the locator of the block that first
/// categorized them. `Foreign` only lives below a block boundary: `BlockNode::run` logs it and
/// turns it into `Runtime` tagged with that block's key.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("template error{}: {message}", locator_suffix(key.as_ref()))]
    Template {
        key: Option<BlockKey>,
        message: String,
        extra: ExtraData,
    },
    #[error("invalid argument `{field}` in {key}: {message}")]
    InvalidArgument {
        key: BlockKey,
        field: String,
        message: String,
        extra: ExtraData,
    },
    #[error("transfer error in {key}: {message}")]
    Transfer {
        key: BlockKey,
        message: String,
        extra: ExtraData,
    },
    #[error("storage error in {key}: {message}")]
    Storage {
        key: BlockKey,
        message: String,
        extra: ExtraData,
    },
    #[error("runtime error in {key}")]
    Runtime { key: BlockKey, extra: ExtraData },
    #[error("unexpected failure: {0}")]
    Foreign(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn locator_suffix(key: Option<&BlockKey>) -> String {
    key.map(|k| format!(" in {k}")).unwrap_or_default()
}

impl BlockError {
    /// A template error raised before a `(type, action)` locator is known.
    pub fn template(message: impl Into<String>) -> Self {
        BlockError::Template {
            key: None,
            message: message.into(),
            extra: ExtraData::new(),
        }
    }

    pub fn foreign<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BlockError::Foreign(Box::new(err))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockError::Template { .. } => ErrorKind::Template,
            BlockError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            BlockError::Transfer { .. } => ErrorKind::Transfer,
            BlockError::Storage { .. } => ErrorKind::Storage,
            BlockError::Runtime { .. } | BlockError::Foreign(_) => ErrorKind::Runtime,
        }
    }

    pub fn key(&self) -> Option<&BlockKey> {
        match self {
            BlockError::Template { key, .. } => key.as_ref(),
            BlockError::InvalidArgument { key, .. }
            | BlockError::Transfer { key, .. }
            | BlockError::Storage { key, .. }
            | BlockError::Runtime { key, .. } => Some(key),
            BlockError::Foreign(_) => None,
        }
    }

    pub fn extra(&self) -> Option<&ExtraData> {
        match self {
            BlockError::Template { extra, .. }
            | BlockError::InvalidArgument { extra, .. }
            | BlockError::Transfer { extra, .. }
            | BlockError::Storage { extra, .. }
            | BlockError::Runtime { extra, .. } => Some(extra),
            BlockError::Foreign(_) => None,
        }
    }

    pub fn is_categorized(&self) -> bool {
        !matches!(self, BlockError::Foreign(_))
    }

    /// Attach one diagnostic entry. No-op on `Foreign`, which has no locator yet.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        if let Some(extra) = self.extra_mut() {
            extra.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_extra_data(mut self, data: ExtraData) -> Self {
        if let Some(extra) = self.extra_mut() {
            extra.extend(data);
        }
        self
    }

    fn extra_mut(&mut self) -> Option<&mut ExtraData> {
        match self {
            BlockError::Template { extra, .. }
            | BlockError::InvalidArgument { extra, .. }
            | BlockError::Transfer { extra, .. }
            | BlockError::Storage { extra, .. }
            | BlockError::Runtime { extra, .. } => Some(extra),
            BlockError::Foreign(_) => None,
        }
    }

    /// Categorized errors pass through; anything else is logged in full and re-raised as a
    /// `Runtime` error carrying only `key`.
    pub fn at_boundary(self, key: &BlockKey, logger: &PlanLogger) -> Self {
        match self {
            BlockError::Foreign(err) => {
                logger.exception(key, err.as_ref());
                key.runtime()
            }
            categorized => categorized,
        }
    }

    /// User-facing rendering. Runtime errors never expose the underlying message.
    pub fn report(&self) -> JsonValue {
        let mut out = Map::new();
        out.insert("kind".to_string(), json!(self.kind().as_str()));
        if let Some(key) = self.key() {
            out.insert("type".to_string(), json!(key.r#type));
            out.insert("action".to_string(), json!(key.action));
        }
        match self {
            BlockError::Template { message, .. }
            | BlockError::Transfer { message, .. }
            | BlockError::Storage { message, .. } => {
                out.insert("message".to_string(), json!(message));
            }
            BlockError::InvalidArgument { field, message, .. } => {
                out.insert("field".to_string(), json!(field));
                out.insert("message".to_string(), json!(message));
            }
            BlockError::Runtime { .. } | BlockError::Foreign(_) => {}
        }
        out.insert(
            "extra".to_string(),
            JsonValue::Object(self.extra().cloned().unwrap_or_default()),
        );
        JsonValue::Object(out)
    }
}

impl From<serde_json::Error> for BlockError {
    fn from(e: serde_json::Error) -> Self {
        BlockError::foreign(e)
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
#[error("plan failed validation ({violations_len} violations)")]
pub struct ValidationError {
    pub violations: Vec<Violation>,
    violations_len: usize,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        let violations_len = violations.len();
        Self {
            violations,
            violations_len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
