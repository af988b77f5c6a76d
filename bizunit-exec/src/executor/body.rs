use bizunit_core::{HeaderMap, Value};

use super::ExecutorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Form,
    Raw,
}

impl BodyFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "json" => Some(BodyFormat::Json),
            "form" => Some(BodyFormat::Form),
            "raw" => Some(BodyFormat::Raw),
            _ => None,
        }
    }

    /// Strings go out as-is, anything else as JSON.
    pub fn infer(body: &Value) -> Self {
        match body {
            Value::String(_) => BodyFormat::Raw,
            _ => BodyFormat::Json,
        }
    }
}

/// Encoded bytes plus the content type to send when the caller did not set one.
pub fn encode_body(body: &Value, format: BodyFormat) -> Result<(Vec<u8>, Option<&'static str>), ExecutorError> {
    if body.is_null() {
        return Ok((Vec::new(), None));
    }
    match format {
        BodyFormat::Json => {
            let bytes = serde_json::to_vec(&body.to_json()).map_err(|e| ExecutorError::Encode(e.to_string()))?;
            Ok((bytes, Some("application/json")))
        }
        BodyFormat::Form => {
            let map = body
                .as_map()
                .ok_or_else(|| ExecutorError::Encode(format!("form body must be a map, got {}", body.type_name())))?;
            let mut pairs = Vec::with_capacity(map.len());
            for (k, v) in map {
                let v = v.to_scalar_string().ok_or_else(|| {
                    ExecutorError::Encode(format!("form field `{k}` must be a scalar, got {}", v.type_name()))
                })?;
                pairs.push(format!("{}={}", urlencoding::encode(k), urlencoding::encode(&v)));
            }
            Ok((pairs.join("&").into_bytes(), Some("application/x-www-form-urlencoded")))
        }
        BodyFormat::Raw => match body.to_scalar_string() {
            Some(s) => Ok((s.into_bytes(), Some("text/plain; charset=utf-8"))),
            None => Err(ExecutorError::Encode(format!(
                "raw body must be a scalar, got {}",
                body.type_name()
            ))),
        },
    }
}

/// JSON content types decode to structured values, anything else to a (lossy) string.
pub fn decode_body(headers: &HeaderMap, bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    let is_json = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .is_some_and(|(_, v)| {
            let v = v.to_ascii_lowercase();
            v.contains("application/json") || v.contains("+json")
        });
    if is_json {
        if let Ok(json) = serde_json::from_slice(bytes) {
            return Value::from_json(json);
        }
    }
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

pub fn has_header(headers: &HeaderMap, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn form_encodes_in_insertion_order() {
        let body = Value::from_json(json!({"b": "x y", "a": 1}));
        let (bytes, ct) = encode_body(&body, BodyFormat::Form).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "b=x%20y&a=1");
        assert_eq!(ct, Some("application/x-www-form-urlencoded"));
    }

    #[test]
    fn json_content_type_is_decoded() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type".into(), "application/problem+json".into());
        assert_eq!(decode_body(&headers, br#"{"a":1}"#).to_json(), json!({"a": 1}));
    }

    #[test]
    fn other_content_is_text() {
        assert_eq!(decode_body(&HeaderMap::new(), b"ok"), Value::from("ok"));
        assert_eq!(decode_body(&HeaderMap::new(), b""), Value::Null);
    }
}
