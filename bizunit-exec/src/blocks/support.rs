use bizunit_core::value::PathKey;
use bizunit_core::{BlockError, BlockKey, HeaderMap, TemplateReader, Value};
use serde_json::Value as JsonValue;

/// A map of scalars rendered as header values.
pub(crate) fn header_map(key: &BlockKey, field: &str, value: Value) -> Result<HeaderMap, BlockError> {
    match value {
        Value::Null => Ok(HeaderMap::new()),
        Value::Map(map) => map
            .into_iter()
            .map(|(k, v)| match v.to_scalar_string() {
                Some(s) => Ok((k, s)),
                None => Err(key.invalid_argument(
                    field,
                    format!("header `{k}` must be a scalar, got {}", v.type_name()),
                )),
            })
            .collect(),
        other => Err(key.invalid_argument(field, format!("expected map, got {}", other.type_name()))),
    }
}

/// Keep only the headers named in `names` (case-insensitive), in source order.
/// An empty declaration keeps everything.
pub(crate) fn intersect_header(source: &HeaderMap, names: &[String]) -> HeaderMap {
    if names.is_empty() {
        return source.clone();
    }
    source
        .iter()
        .filter(|(k, _)| names.iter().any(|n| n.eq_ignore_ascii_case(k)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Keep only the top-level body keys named in `names`, in source order. Non-map bodies and
/// empty declarations pass through unchanged.
pub(crate) fn intersect_body(source: &Value, names: &[String]) -> Value {
    match source {
        Value::Map(map) if !names.is_empty() => Value::Map(
            map.iter()
                .filter(|(k, _)| names.iter().any(|n| n == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// A literal path: a list of names and non-negative indexes.
pub(crate) fn literal_path(reader: &TemplateReader<'_>, field: &str) -> Result<Vec<PathKey>, BlockError> {
    match reader.value(field) {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| match item {
                JsonValue::String(s) => Some(PathKey::Name(s.clone())),
                JsonValue::Number(n) => n.as_u64().map(|i| PathKey::Index(i as usize)),
                _ => None,
            })
            .map(|key| {
                key.ok_or_else(|| {
                    reader
                        .key()
                        .template_error(format!("`{field}` entries must be names or indexes"))
                })
            })
            .collect(),
        Some(_) => Err(reader
            .key()
            .template_error(format!("`{field}` must be a list"))),
    }
}

pub(crate) fn path_json(path: &[PathKey]) -> JsonValue {
    JsonValue::Array(
        path.iter()
            .map(|k| match k {
                PathKey::Name(s) => JsonValue::String(s.clone()),
                PathKey::Index(i) => JsonValue::from(*i as u64),
            })
            .collect(),
    )
}

pub(crate) fn path_display(path: &[PathKey]) -> String {
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_intersection_keeps_source_order() {
        let mut source = HeaderMap::new();
        source.insert("A".into(), "1".into());
        source.insert("B".into(), "2".into());
        source.insert("C".into(), "3".into());
        let out = intersect_header(&source, &["c".into(), "A".into()]);
        let keys: Vec<_> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["A", "C"]);
    }

    #[test]
    fn empty_declaration_keeps_everything() {
        let mut source = HeaderMap::new();
        source.insert("A".into(), "1".into());
        assert_eq!(intersect_header(&source, &[]), source);
        let body = Value::from("raw");
        assert_eq!(intersect_body(&body, &["x".into()]), body);
    }
}
