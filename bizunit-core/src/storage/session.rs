use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::context::{HeaderMap, ProtocolContext};
use crate::value::{Value, ValueMap};

/// The inbound request that triggered this plan execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OriginRequest {
    pub method: String,
    pub path: String,
    pub query: IndexMap<String, String>,
    pub header: HeaderMap,
    pub body: Value,
}

impl OriginRequest {
    /// Lenient: missing fields default, scalar header and query values are stringified.
    pub fn from_json(json: &JsonValue) -> Self {
        let strings = |field: &str| -> IndexMap<String, String> {
            json.get(field)
                .and_then(JsonValue::as_object)
                .map(|obj| {
                    obj.iter()
                        .filter_map(|(k, v)| {
                            Value::from_json(v.clone())
                                .to_scalar_string()
                                .map(|s| (k.clone(), s))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };
        Self {
            method: json
                .get("method")
                .and_then(JsonValue::as_str)
                .unwrap_or("GET")
                .to_ascii_uppercase(),
            path: json
                .get("path")
                .and_then(JsonValue::as_str)
                .unwrap_or("/")
                .to_string(),
            query: strings("query"),
            header: strings("header"),
            body: json.get("body").cloned().map(Value::from_json).unwrap_or_default(),
        }
    }

    pub fn context(&self) -> ProtocolContext {
        ProtocolContext::new(self.header.clone(), self.body.clone(), None)
    }

    pub fn to_value(&self) -> Value {
        let strings = |m: &IndexMap<String, String>| {
            Value::Map(
                m.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            )
        };
        let mut map = ValueMap::new();
        map.insert("method".into(), Value::String(self.method.clone()));
        map.insert("path".into(), Value::String(self.path.clone()));
        map.insert("query".into(), strings(&self.query));
        map.insert("header".into(), strings(&self.header));
        map.insert("body".into(), self.body.clone());
        Value::Map(map)
    }
}

/// The authenticated account on whose behalf the plan runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountManager {
    pub account_id: Option<String>,
    pub name: Option<String>,
    pub attributes: ValueMap,
}

impl AccountManager {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn to_value(&self) -> Value {
        let opt = |s: &Option<String>| s.clone().map(Value::String).unwrap_or(Value::Null);
        let mut map = ValueMap::new();
        map.insert("accountId".into(), opt(&self.account_id));
        map.insert("name".into(), opt(&self.name));
        map.insert("attributes".into(), Value::Map(self.attributes.clone()));
        Value::Map(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionManager {
    pub transaction_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl TransactionManager {
    pub fn begin() -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = ValueMap::new();
        map.insert("transactionId".into(), Value::String(self.transaction_id.to_string()));
        map.insert("startedAt".into(), Value::String(self.started_at.to_rfc3339()));
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn origin_from_json_stringifies_scalars() {
        let origin = OriginRequest::from_json(&json!({
            "method": "post",
            "header": {"X-Count": 3, "Accept": "application/json"},
            "body": {"id": 7}
        }));
        assert_eq!(origin.method, "POST");
        assert_eq!(origin.path, "/");
        assert_eq!(origin.header.get("X-Count").map(String::as_str), Some("3"));
        assert_eq!(origin.body.to_json(), json!({"id": 7}));
    }
}
