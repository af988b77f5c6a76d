//! Protocol executors: stateless per-call helpers that perform the network I/O for protocol
//! blocks and normalize the result to `(status, headers, body)`.

pub mod access_log;
mod body;
mod error;
pub mod http;
mod request;
mod soap;

use std::time::{Duration, Instant};

use bizunit_core::services::{HttpClient, HttpRequestParts};
use bizunit_core::{HeaderMap, PlanLogger, ProtocolContext, ProtocolExchange, Value};

pub use body::{decode_body, encode_body, BodyFormat};
pub use error::ExecutorError;
pub use http::ReqwestHttpClient;
pub use request::HttpExecutor;
pub use soap::{SoapExecutor, SoapVersion};

/// What was sent and what came back.
#[derive(Debug, Clone)]
pub struct RawExchange {
    pub method: String,
    pub url: url::Url,
    pub request_headers: HeaderMap,
    pub request_body: Value,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RawExchange {
    pub fn into_exchange(self) -> ProtocolExchange {
        ProtocolExchange::new(
            ProtocolContext::new(self.request_headers, self.request_body, None),
            ProtocolContext::new(self.headers, self.body, Some(self.status)),
        )
    }
}

pub(crate) struct Dispatch {
    pub parts: HttpRequestParts,
    pub request_body: Value,
    pub timeout: Duration,
    pub max_response_bytes: usize,
    pub trace: bool,
}

pub(crate) async fn dispatch(
    client: &dyn HttpClient,
    logger: &PlanLogger,
    call: Dispatch,
) -> Result<RawExchange, ExecutorError> {
    let Dispatch {
        parts,
        request_body,
        timeout,
        max_response_bytes,
        trace,
    } = call;
    let method = parts.method.clone();
    let url = parts.url.clone();
    let request_headers = parts.headers.clone();
    let sent_body = parts.body.clone();

    let started = Instant::now();
    let result = client.send(parts, timeout, max_response_bytes).await;
    let elapsed = started.elapsed();

    let mut record = access_log::ExchangeRecord {
        method: &method,
        url: &url,
        request_headers: &request_headers,
        request_body: &sent_body,
        outcome: Err(""),
        elapsed,
        trace,
    };
    match result {
        Ok(resp) => {
            record.outcome = Ok((resp.status, &resp.headers, &resp.body));
            access_log::log_exchange(logger, &record);
            let body = decode_body(&resp.headers, &resp.body);
            Ok(RawExchange {
                method,
                url,
                request_headers,
                request_body,
                status: resp.status,
                headers: resp.headers,
                body,
            })
        }
        Err(e) => {
            let message = e.to_string();
            record.outcome = Err(&message);
            access_log::log_exchange(logger, &record);
            Err(ExecutorError::Transport(e))
        }
    }
}
