use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};

use crate::value::Value;

/// Ordered header map; order follows the source the headers were taken from.
pub type HeaderMap = IndexMap<String, String>;

/// One side of a protocol exchange, normalized across transports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolContext {
    pub header: HeaderMap,
    pub body: Value,
    pub status_code: Option<u16>,
}

impl ProtocolContext {
    pub fn new(header: HeaderMap, body: Value, status_code: Option<u16>) -> Self {
        Self {
            header,
            body,
            status_code,
        }
    }

    /// No header, null body, no status.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.header
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "header": self.header,
            "body": self.body.to_json(),
            "statusCode": self.status_code,
        })
    }
}

/// The `(request, response)` pair produced by every protocol-unit block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolExchange {
    pub request: ProtocolContext,
    pub response: ProtocolContext,
}

impl ProtocolExchange {
    pub fn new(request: ProtocolContext, response: ProtocolContext) -> Self {
        Self { request, response }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "request": self.request.to_json(),
            "response": self.response.to_json(),
        })
    }
}

/// The author-chosen response that terminates a plan execution early.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResponse {
    pub status: u16,
    pub header: HeaderMap,
    pub body: Value,
}

impl PlanResponse {
    pub fn new(status: u16, header: HeaderMap, body: Value) -> Self {
        Self {
            status,
            header,
            body,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "status": self.status,
            "header": self.header,
            "body": self.body.to_json(),
        })
    }
}
