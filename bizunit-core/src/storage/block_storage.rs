use crate::error::{BlockError, BlockKey};
use crate::value::{FromValue, PathError, PathKey, Value, ValueMap};

/// The scratch map passed by reference through every block execution.
///
/// Blocks write under their own id and read under another's; nothing is typed at write time,
/// so reads go through [`BlockStorage::get_as`] which reports a mismatch against the reader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockStorage {
    entries: ValueMap,
}

impl BlockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries.get_mut(name)
    }

    pub fn get_as<T: FromValue>(&self, reader: &BlockKey, name: &str) -> Result<T, BlockError> {
        let value = self.entries.get(name).ok_or_else(|| {
            reader.invalid_argument(name, format!("no entry `{name}` in block storage"))
        })?;
        reader.expect(name, value.clone())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Map stored under `name`, created (or replacing a non-map) on first use.
    pub fn section_mut(&mut self, name: &str) -> &mut ValueMap {
        let slot = self.entries.entry(name.to_string()).or_insert(Value::Null);
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(ValueMap::new());
        }
        match slot {
            Value::Map(map) => map,
            _ => unreachable!("section slot was just set to a map"),
        }
    }

    pub fn lookup(&self, path: &[PathKey]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        self.entries.get(&first.to_string())?.lookup(rest)
    }

    pub fn insert_at(&mut self, path: &[PathKey], value: Value) -> Result<(), PathError> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(());
        };
        self.entries
            .entry(first.to_string())
            .or_insert(Value::Null)
            .insert_at(rest, value)
    }

    pub fn remove_at(&mut self, path: &[PathKey]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        if rest.is_empty() {
            return self.entries.shift_remove(&first.to_string());
        }
        self.entries.get_mut(&first.to_string())?.remove_at(rest)
    }

    pub fn as_map(&self) -> &ValueMap {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_as_reports_reader_and_field() {
        let mut storage = BlockStorage::new();
        storage.insert("count", "three");
        let reader = BlockKey::new("arraylist", "count");
        let err = storage.get_as::<i64>(&reader, "count").unwrap_err();
        assert!(matches!(
            err,
            BlockError::InvalidArgument { ref field, ref key, .. } if field == "count" && *key == reader
        ));
    }

    #[test]
    fn section_is_created_once() {
        let mut storage = BlockStorage::new();
        storage.section_mut("RequestOperatorStorage").insert("a".into(), Value::Int(1));
        storage.section_mut("RequestOperatorStorage").insert("b".into(), Value::Int(2));
        assert_eq!(storage.get("RequestOperatorStorage").and_then(Value::as_map).map(|m| m.len()), Some(2));
    }
}
