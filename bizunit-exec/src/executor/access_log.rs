//! Access logging for protocol exchanges.
//!
//! Production gets one common-log-format line per exchange. Anywhere else, traced exchanges are
//! dumped in full with credentials redacted. The branch is taken when the line is written.

use std::time::Duration;

use bizunit_core::{HeaderMap, PlanLogger};

const REDACTED: &str = "<redacted>";
const MAX_DUMP_BYTES: usize = 16 * 1024;

/// Lowercased header names that never reach a log.
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "proxy-authorization"];

pub struct ExchangeRecord<'a> {
    pub method: &'a str,
    pub url: &'a url::Url,
    pub request_headers: &'a HeaderMap,
    pub request_body: &'a [u8],
    pub outcome: Result<(u16, &'a HeaderMap, &'a [u8]), &'a str>,
    pub elapsed: Duration,
    pub trace: bool,
}

pub fn log_exchange(logger: &PlanLogger, record: &ExchangeRecord<'_>) {
    if logger.env().is_production() || !record.trace {
        logger.access(&common_log_line(record));
        return;
    }
    let request_headers = redact_headers(record.request_headers);
    match record.outcome {
        Ok((status, headers, body)) => tracing::debug!(
            target: "bizunit::access",
            run_id = %logger.run_id(),
            method = record.method,
            url = %record.url,
            request_headers = ?request_headers,
            request_body = %dump_body(record.request_body),
            status,
            response_headers = ?redact_headers(headers),
            response_body = %dump_body(body),
            elapsed_ms = record.elapsed.as_millis() as u64,
            "exchange"
        ),
        Err(error) => tracing::debug!(
            target: "bizunit::access",
            run_id = %logger.run_id(),
            method = record.method,
            url = %record.url,
            request_headers = ?request_headers,
            request_body = %dump_body(record.request_body),
            error,
            elapsed_ms = record.elapsed.as_millis() as u64,
            "exchange failed"
        ),
    }
}

pub(crate) fn common_log_line(record: &ExchangeRecord<'_>) -> String {
    let host = record.url.host_str().unwrap_or("-");
    let target = match record.url.query() {
        Some(q) => format!("{}?{}", record.url.path(), q),
        None => record.url.path().to_string(),
    };
    let (status, bytes) = match record.outcome {
        Ok((status, _, body)) => (status.to_string(), body.len().to_string()),
        Err(_) => ("-".to_string(), "-".to_string()),
    };
    format!(
        "{host} - - [{}] \"{} {target} HTTP/1.1\" {status} {bytes} {}ms",
        chrono::Utc::now().format("%d/%b/%Y:%H:%M:%S %z"),
        record.method,
        record.elapsed.as_millis()
    )
}

pub fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .map(|(k, v)| {
            let sensitive = SENSITIVE_HEADERS.iter().any(|s| k.eq_ignore_ascii_case(s));
            let v = if sensitive { REDACTED.to_string() } else { v.clone() };
            (k.clone(), v)
        })
        .collect()
}

fn dump_body(body: &[u8]) -> String {
    if body.len() <= MAX_DUMP_BYTES {
        String::from_utf8_lossy(body).into_owned()
    } else {
        format!(
            "{}...<{} bytes truncated>",
            String::from_utf8_lossy(&body[..MAX_DUMP_BYTES]),
            body.len() - MAX_DUMP_BYTES
        )
    }
}
