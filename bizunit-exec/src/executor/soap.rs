use std::sync::Arc;

use bizunit_core::config::TransportConfig;
use bizunit_core::services::{HttpClient, HttpRequestParts};
use bizunit_core::{AppEnv, HeaderMap, PlanLogger, Value, ValueMap};

use super::request::{bool_option, parse_endpoint, set_header, timeout_option};
use super::{dispatch, Dispatch, ExecutorError, RawExchange};
use crate::xml;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapVersion {
    #[default]
    V11,
    V12,
}

impl SoapVersion {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1.1" => Some(SoapVersion::V11),
            "1.2" => Some(SoapVersion::V12),
            _ => None,
        }
    }

    fn namespace(self) -> &'static str {
        match self {
            SoapVersion::V11 => "http://schemas.xmlsoap.org/soap/envelope/",
            SoapVersion::V12 => "http://www.w3.org/2003/05/soap-envelope",
        }
    }
}

/// Builder for one SOAP call over HTTP POST.
///
/// The payload becomes the envelope body (strings are embedded verbatim as XML, other values
/// go through the XML mapping). The response body is the decoded `Body` element; a fault shows
/// up as its `Fault` entry.
pub struct SoapExecutor {
    client: Arc<dyn HttpClient>,
    max_response_bytes: usize,
    endpoint: String,
    action: Option<String>,
    headers: HeaderMap,
    payload: Value,
    options: ValueMap,
}

impl SoapExecutor {
    pub fn new(client: Arc<dyn HttpClient>, transport: &TransportConfig, env: AppEnv) -> Self {
        let mut options = ValueMap::new();
        options.insert(
            "timeout".into(),
            Value::Float(transport.timeout_ms as f64 / 1000.0),
        );
        options.insert("trace".into(), Value::Bool(!env.is_production()));
        options.insert("version".into(), Value::String("1.1".into()));
        Self {
            client,
            max_response_bytes: transport.max_response_bytes,
            endpoint: String::new(),
            action: None,
            headers: HeaderMap::new(),
            payload: Value::Null,
            options,
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn action(mut self, action: Option<String>) -> Self {
        self.action = action;
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (k, v) in headers {
            set_header(&mut self.headers, k, v);
        }
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn options(mut self, options: ValueMap) -> Self {
        self.options.extend(options);
        self
    }

    pub fn envelope(&self) -> Result<String, ExecutorError> {
        let version = self.version()?;
        let body = match &self.payload {
            Value::Null => String::new(),
            Value::String(raw) => raw.clone(),
            other => xml::encode(other, "Request").map_err(|e| ExecutorError::Encode(e.to_string()))?,
        };
        Ok(format!(
            r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="{}"><soap:Body>{body}</soap:Body></soap:Envelope>"#,
            version.namespace()
        ))
    }

    fn version(&self) -> Result<SoapVersion, ExecutorError> {
        match self.options.get("version") {
            None | Some(Value::Null) => Ok(SoapVersion::default()),
            Some(Value::String(s)) => SoapVersion::parse(s).ok_or_else(|| ExecutorError::InvalidOption {
                name: "version".into(),
                message: format!("expected 1.1 or 1.2, got `{s}`"),
            }),
            Some(other) => Err(ExecutorError::InvalidOption {
                name: "version".into(),
                message: format!("expected string, got {}", other.type_name()),
            }),
        }
    }

    pub async fn execute(self, logger: &PlanLogger) -> Result<RawExchange, ExecutorError> {
        let url = parse_endpoint(&self.endpoint)?;
        let version = self.version()?;
        let timeout = timeout_option(&self.options)?;
        let trace = bool_option(&self.options, "trace")?;
        let envelope = self.envelope()?;

        let mut headers = self.headers;
        match (version, &self.action) {
            (SoapVersion::V11, action) => {
                set_header(&mut headers, "Content-Type".into(), "text/xml; charset=utf-8".into());
                set_header(
                    &mut headers,
                    "SOAPAction".into(),
                    format!("\"{}\"", action.as_deref().unwrap_or_default()),
                );
            }
            (SoapVersion::V12, Some(action)) => {
                set_header(
                    &mut headers,
                    "Content-Type".into(),
                    format!("application/soap+xml; charset=utf-8; action=\"{action}\""),
                );
            }
            (SoapVersion::V12, None) => {
                set_header(
                    &mut headers,
                    "Content-Type".into(),
                    "application/soap+xml; charset=utf-8".into(),
                );
            }
        }

        let parts = HttpRequestParts {
            method: "POST".into(),
            url,
            headers,
            body: envelope.clone().into_bytes(),
        };
        let mut exchange = dispatch(
            self.client.as_ref(),
            logger,
            Dispatch {
                parts,
                request_body: Value::String(envelope),
                timeout,
                max_response_bytes: self.max_response_bytes,
                trace,
            },
        )
        .await?;
        exchange.body = envelope_body(&exchange.body)?;
        Ok(exchange)
    }
}

/// Pull the `Body` content out of a response envelope. Non-XML responses (e.g. an HTML error
/// page from a proxy) are returned untouched.
fn envelope_body(raw: &Value) -> Result<Value, ExecutorError> {
    let Value::String(text) = raw else {
        return Ok(raw.clone());
    };
    if !text.trim_start().starts_with('<') {
        return Ok(raw.clone());
    }
    let doc = xml::decode(text)?;
    Ok(doc
        .lookup(&["Envelope".into(), "Body".into()])
        .unwrap_or(doc))
}
