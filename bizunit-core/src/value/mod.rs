mod path;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as JsonValue};

use crate::context::{ProtocolContext, ProtocolExchange};
use crate::error::{BlockError, BlockKey};

pub use path::{PathError, PathKey};

/// Ordered string-keyed map of values.
pub type ValueMap = IndexMap<String, Value>;

/// An opaque support object passed between blocks (date-times, driver handles, ...).
pub trait HandleObject: Any + Send + Sync + fmt::Debug {
    fn kind(&self) -> &'static str;
    fn to_json(&self) -> JsonValue;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Clone, Debug)]
pub struct Handle(Arc<dyn HandleObject>);

impl Handle {
    pub fn new<T: HandleObject>(object: T) -> Self {
        Self(Arc::new(object))
    }

    pub fn kind(&self) -> &'static str {
        self.0.kind()
    }

    pub fn downcast_ref<T: HandleObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn to_json(&self) -> JsonValue {
        self.0.to_json()
    }

    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Runtime value flowing between blocks and through block storage.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(ValueMap),
    Context(Box<ProtocolContext>),
    Exchange(Box<ProtocolExchange>),
    Handle(Handle),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Context(a), Value::Context(b)) => a == b,
            (Value::Exchange(a), Value::Exchange(b)) => a == b,
            (Value::Handle(a), Value::Handle(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Context(_) => "context",
            Value::Exchange(_) => "exchange",
            Value::Handle(_) => "handle",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_context(&self) -> Option<&ProtocolContext> {
        match self {
            Value::Context(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_exchange(&self) -> Option<&ProtocolExchange> {
        match self {
            Value::Exchange(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Value::Handle(h) => Some(h),
            _ => None,
        }
    }

    /// String rendering for scalars; `None` for containers and handles.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, JsonValue>>(),
            ),
            Value::Context(c) => c.to_json(),
            Value::Exchange(e) => e.to_json(),
            Value::Handle(h) => h.to_json(),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::from_json(json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<ValueMap> for Value {
    fn from(m: ValueMap) -> Self {
        Value::Map(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<ProtocolContext> for Value {
    fn from(c: ProtocolContext) -> Self {
        Value::Context(Box::new(c))
    }
}

impl From<ProtocolExchange> for Value {
    fn from(e: ProtocolExchange) -> Self {
        Value::Exchange(Box::new(e))
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Value::Handle(h)
    }
}

/// Typed extraction of a child block's result.
///
/// On mismatch the original value is handed back so the caller can report what it got.
pub trait FromValue: Sized {
    fn expected() -> String;
    fn from_value(value: Value) -> Result<Self, Value>;
}

impl FromValue for Value {
    fn expected() -> String {
        "any".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

impl FromValue for String {
    fn expected() -> String {
        "string".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromValue for i64 {
    fn expected() -> String {
        "int".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other),
        }
    }
}

impl FromValue for f64 {
    fn expected() -> String {
        "number".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(other),
        }
    }
}

impl FromValue for bool {
    fn expected() -> String {
        "bool".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromValue for ValueMap {
    fn expected() -> String {
        "map".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Map(m) => Ok(m),
            other => Err(other),
        }
    }
}

impl FromValue for Vec<Value> {
    fn expected() -> String {
        "list".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::List(l) => Ok(l),
            other => Err(other),
        }
    }
}

impl FromValue for ProtocolContext {
    fn expected() -> String {
        "context".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Context(c) => Ok(*c),
            other => Err(other),
        }
    }
}

impl FromValue for ProtocolExchange {
    fn expected() -> String {
        "exchange".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Exchange(e) => Ok(*e),
            other => Err(other),
        }
    }
}

impl FromValue for Handle {
    fn expected() -> String {
        "handle".to_string()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Handle(h) => Ok(h),
            other => Err(other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn expected() -> String {
        format!("{} or null", T::expected())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl BlockKey {
    /// Validate a child result's runtime type, naming `field` on mismatch.
    pub fn expect<T: FromValue>(&self, field: &str, value: Value) -> Result<T, BlockError> {
        T::from_value(value).map_err(|got| {
            self.invalid_argument(
                field,
                format!("expected {}, got {}", T::expected(), got.type_name()),
            )
        })
    }

    /// Like [`BlockKey::expect`] for opaque handles of a concrete support type.
    pub fn expect_handle<T: HandleObject + Clone>(&self, field: &str, value: Value) -> Result<T, BlockError> {
        let found = value.type_name();
        match value {
            Value::Handle(h) => match h.downcast_ref::<T>() {
                Some(obj) => Ok(obj.clone()),
                None => Err(self.invalid_argument(
                    field,
                    format!("expected handle, got handle of kind {}", h.kind()),
                )),
            },
            _ => Err(self.invalid_argument(field, format!("expected handle, got {found}"))),
        }
    }
}
