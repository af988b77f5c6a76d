use std::fmt;

use thiserror::Error;

use super::{Value, ValueMap};
use crate::context::ProtocolContext;

/// One segment of a nested lookup path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    Name(String),
    Index(usize),
}

impl PathKey {
    /// Strings become names, non-negative ints become indexes.
    pub fn from_value(value: &Value) -> Option<PathKey> {
        match value {
            Value::String(s) => Some(PathKey::Name(s.clone())),
            Value::Int(i) if *i >= 0 => Some(PathKey::Index(*i as usize)),
            _ => None,
        }
    }

    fn as_index(&self) -> Option<usize> {
        match self {
            PathKey::Index(i) => Some(*i),
            PathKey::Name(s) => s.parse().ok(),
        }
    }

    fn as_name(&self) -> String {
        match self {
            PathKey::Name(s) => s.clone(),
            PathKey::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Name(s) => f.write_str(s),
            PathKey::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathKey {
    fn from(s: &str) -> Self {
        PathKey::Name(s.to_string())
    }
}

impl From<usize> for PathKey {
    fn from(i: usize) -> Self {
        PathKey::Index(i)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("cannot descend into {found} at `{key}`")]
    NotContainer { key: String, found: &'static str },
    #[error("`{0}` is not a list index")]
    InvalidIndex(String),
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

fn context_lookup(ctx: &ProtocolContext, path: &[PathKey]) -> Option<Value> {
    let (first, rest) = path.split_first()?;
    match first.as_name().as_str() {
        "header" => {
            let header: ValueMap = ctx
                .header
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            Value::Map(header).lookup(rest)
        }
        "body" => ctx.body.lookup(rest),
        "statusCode" => ctx
            .status_code
            .map(|s| Value::Int(i64::from(s)))
            .unwrap_or(Value::Null)
            .lookup(rest),
        _ => None,
    }
}

impl Value {
    /// Walk `path` and return a copy of the value found there.
    ///
    /// Contexts expose `header`, `body` and `statusCode`; exchanges expose `request` and
    /// `response`.
    pub fn lookup(&self, path: &[PathKey]) -> Option<Value> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self.clone());
        };
        match self {
            Value::Map(m) => m.get(&first.as_name())?.lookup(rest),
            Value::List(l) => l.get(first.as_index()?)?.lookup(rest),
            Value::Context(c) => context_lookup(c, path),
            Value::Exchange(e) => match first.as_name().as_str() {
                "request" if rest.is_empty() => Some(Value::from(e.request.clone())),
                "response" if rest.is_empty() => Some(Value::from(e.response.clone())),
                "request" => context_lookup(&e.request, rest),
                "response" => context_lookup(&e.response, rest),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn lookup_mut(&mut self, path: &[PathKey]) -> Option<&mut Value> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            Value::Map(m) => m.get_mut(&first.as_name())?.lookup_mut(rest),
            Value::List(l) => l.get_mut(first.as_index()?)?.lookup_mut(rest),
            Value::Context(c) if first.as_name() == "body" => c.body.lookup_mut(rest),
            _ => None,
        }
    }

    /// Write `value` at `path`, creating intermediate maps where the path runs into null.
    /// A list index equal to the list length appends.
    pub fn insert_at(&mut self, path: &[PathKey], value: Value) -> Result<(), PathError> {
        let Some((last, parents)) = path.split_last() else {
            *self = value;
            return Ok(());
        };
        let mut current = self;
        for key in parents {
            current = current.child_or_insert(key)?;
        }
        current.set_child(last, value)
    }

    /// Remove and return the value at `path`. Lists are re-indexed after removal.
    pub fn remove_at(&mut self, path: &[PathKey]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        match self.lookup_mut(parents)? {
            Value::Map(m) => m.shift_remove(&last.as_name()),
            Value::List(l) => {
                let index = last.as_index()?;
                (index < l.len()).then(|| l.remove(index))
            }
            _ => None,
        }
    }

    fn child_or_insert(&mut self, key: &PathKey) -> Result<&mut Value, PathError> {
        if self.is_null() {
            *self = Value::Map(ValueMap::new());
        }
        match self {
            Value::Map(m) => Ok(m.entry(key.as_name()).or_insert(Value::Null)),
            Value::List(l) => {
                let len = l.len();
                let index = key
                    .as_index()
                    .ok_or_else(|| PathError::InvalidIndex(key.as_name()))?;
                l.get_mut(index)
                    .ok_or(PathError::IndexOutOfBounds { index, len })
            }
            other => Err(PathError::NotContainer {
                key: key.as_name(),
                found: other.type_name(),
            }),
        }
    }

    fn set_child(&mut self, key: &PathKey, value: Value) -> Result<(), PathError> {
        if self.is_null() {
            *self = Value::Map(ValueMap::new());
        }
        match self {
            Value::Map(m) => {
                m.insert(key.as_name(), value);
                Ok(())
            }
            Value::List(l) => {
                let index = key
                    .as_index()
                    .ok_or_else(|| PathError::InvalidIndex(key.as_name()))?;
                let len = l.len();
                if index < len {
                    l[index] = value;
                    Ok(())
                } else if index == len {
                    l.push(value);
                    Ok(())
                } else {
                    Err(PathError::IndexOutOfBounds { index, len })
                }
            }
            other => Err(PathError::NotContainer {
                key: key.as_name(),
                found: other.type_name(),
            }),
        }
    }
}
