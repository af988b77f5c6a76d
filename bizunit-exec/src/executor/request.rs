use std::sync::Arc;
use std::time::Duration;

use bizunit_core::config::TransportConfig;
use bizunit_core::services::{HttpClient, HttpRequestParts};
use bizunit_core::{AppEnv, HeaderMap, PlanLogger, Value, ValueMap};

use super::body::{encode_body, has_header, BodyFormat};
use super::{dispatch, Dispatch, ExecutorError, RawExchange};

/// Builder for one HTTP call.
///
/// Standard options (`timeout` from the transport config, `trace` off in production) are
/// applied first; every [`HttpExecutor::options`] call merges over them, later keys winning.
/// Recognized options: `timeout` (seconds), `query` (map appended to the URL), `headers` (map
/// merged after the explicit headers), `body_format` (`json`, `form`, `raw`), `trace` (bool).
pub struct HttpExecutor {
    client: Arc<dyn HttpClient>,
    max_response_bytes: usize,
    method: String,
    endpoint: String,
    headers: HeaderMap,
    body: Value,
    options: ValueMap,
}

impl HttpExecutor {
    pub fn new(client: Arc<dyn HttpClient>, transport: &TransportConfig, env: AppEnv) -> Self {
        let mut options = ValueMap::new();
        options.insert(
            "timeout".into(),
            Value::Float(transport.timeout_ms as f64 / 1000.0),
        );
        options.insert("trace".into(), Value::Bool(!env.is_production()));
        Self {
            client,
            max_response_bytes: transport.max_response_bytes,
            method: "GET".to_string(),
            endpoint: String::new(),
            headers: HeaderMap::new(),
            body: Value::Null,
            options,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (k, v) in headers {
            set_header(&mut self.headers, k, v);
        }
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn options(mut self, options: ValueMap) -> Self {
        self.options.extend(options);
        self
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    pub async fn execute(self, logger: &PlanLogger) -> Result<RawExchange, ExecutorError> {
        let method = self.method.trim().to_ascii_uppercase();
        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(ExecutorError::InvalidMethod(self.method));
        }
        let mut url = parse_endpoint(&self.endpoint)?;
        let timeout = timeout_option(&self.options)?;
        let trace = bool_option(&self.options, "trace")?;

        if let Some(query) = self.options.get("query") {
            let query = map_option("query", query)?;
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                let v = scalar_option("query", k, v)?;
                pairs.append_pair(k, &v);
            }
        }

        let mut headers = self.headers;
        if let Some(extra) = self.options.get("headers") {
            for (k, v) in map_option("headers", extra)? {
                let v = scalar_option("headers", k, v)?;
                set_header(&mut headers, k.clone(), v);
            }
        }

        let format = match self.options.get("body_format") {
            None | Some(Value::Null) => BodyFormat::infer(&self.body),
            Some(Value::String(s)) => BodyFormat::parse(s).ok_or_else(|| ExecutorError::InvalidOption {
                name: "body_format".into(),
                message: format!("expected json, form or raw, got `{s}`"),
            })?,
            Some(other) => {
                return Err(ExecutorError::InvalidOption {
                    name: "body_format".into(),
                    message: format!("expected string, got {}", other.type_name()),
                })
            }
        };
        let (bytes, content_type) = encode_body(&self.body, format)?;
        if let Some(ct) = content_type {
            if !has_header(&headers, "content-type") {
                headers.insert("Content-Type".into(), ct.into());
            }
        }

        let parts = HttpRequestParts {
            method,
            url,
            headers,
            body: bytes,
        };
        dispatch(
            self.client.as_ref(),
            logger,
            Dispatch {
                parts,
                request_body: self.body,
                timeout,
                max_response_bytes: self.max_response_bytes,
                trace,
            },
        )
        .await
    }
}

/// Replace any header with the same name (case-insensitively), keeping its position.
pub(crate) fn set_header(headers: &mut HeaderMap, name: String, value: String) {
    match headers.keys().position(|k| k.eq_ignore_ascii_case(&name)) {
        Some(idx) => {
            headers.shift_remove_index(idx);
            headers.shift_insert(idx, name, value);
        }
        None => {
            headers.insert(name, value);
        }
    }
}

pub(crate) fn parse_endpoint(endpoint: &str) -> Result<url::Url, ExecutorError> {
    let url = url::Url::parse(endpoint.trim()).map_err(|e| ExecutorError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ExecutorError::InvalidEndpoint(format!(
            "{endpoint}: unsupported scheme `{other}`"
        ))),
    }
}

pub(crate) fn timeout_option(options: &ValueMap) -> Result<Duration, ExecutorError> {
    let secs = match options.get("timeout") {
        Some(Value::Int(i)) => *i as f64,
        Some(Value::Float(f)) => *f,
        Some(other) => {
            return Err(ExecutorError::InvalidOption {
                name: "timeout".into(),
                message: format!("expected seconds, got {}", other.type_name()),
            })
        }
        None => 30.0,
    };
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ExecutorError::InvalidOption {
            name: "timeout".into(),
            message: "must be a positive number of seconds".into(),
        });
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ExecutorError::InvalidOption {
        name: "timeout".into(),
        message: e.to_string(),
    })
}

pub(crate) fn bool_option(options: &ValueMap, name: &str) -> Result<bool, ExecutorError> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(ExecutorError::InvalidOption {
            name: name.into(),
            message: format!("expected bool, got {}", other.type_name()),
        }),
    }
}

fn map_option<'a>(name: &str, value: &'a Value) -> Result<&'a ValueMap, ExecutorError> {
    value.as_map().ok_or_else(|| ExecutorError::InvalidOption {
        name: name.into(),
        message: format!("expected map, got {}", value.type_name()),
    })
}

fn scalar_option(name: &str, key: &str, value: &Value) -> Result<String, ExecutorError> {
    value.to_scalar_string().ok_or_else(|| ExecutorError::InvalidOption {
        name: name.into(),
        message: format!("`{key}` must be a scalar, got {}", value.type_name()),
    })
}
