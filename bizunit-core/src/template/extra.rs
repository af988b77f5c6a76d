use serde_json::{Map, Value as JsonValue};

use crate::error::BlockError;

/// Block metadata carried alongside the template (ids, display hints, editor state).
///
/// Nothing here affects execution; it is kept so that re-serializing a plan loses nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraManager {
    data: Map<String, JsonValue>,
}

impl ExtraManager {
    pub fn new(data: Map<String, JsonValue>) -> Self {
        Self { data }
    }

    pub fn from_json(json: Option<&JsonValue>) -> Result<Self, BlockError> {
        match json {
            None | Some(JsonValue::Null) => Ok(Self::default()),
            Some(JsonValue::Object(map)) => Ok(Self::new(map.clone())),
            Some(_) => Err(BlockError::template("`extra` must be an object")),
        }
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    pub fn id(&self) -> Option<&str> {
        self.data.get("id").and_then(JsonValue::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        self.data.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.data.clone())
    }
}
