mod support;

use std::time::Duration;

use bizunit_core::services::HttpError;
use bizunit_core::{BlockStorage, ErrorKind, RuntimeConfig};
use serde_json::{json, Value as JsonValue};

use support::{block, continued, integer, literal, plan_storage, run, services, string, MockHttp};

fn http(template: JsonValue) -> JsonValue {
    block("protocol", "http", template)
}

fn soap(template: JsonValue) -> JsonValue {
    block("protocol", "soap", template)
}

const PRICE_RESPONSE: &str = r#"<?xml version="1.0"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body><m:GetPriceResponse xmlns:m="urn:shop"><m:Price>1.5</m:Price></m:GetPriceResponse></soap:Body>
</soap:Envelope>"#;

#[tokio::test]
async fn http_sends_resolved_inputs_and_yields_the_exchange() {
    let mock = MockHttp::json(201, json!({"id": 9, "status": "created"}));
    let mut plan = plan_storage(services(mock.clone()));
    let template = http(json!({
        "method": string("post"),
        "endpoint": string("https://api.example.com/orders"),
        "header": literal(json!({"X-Id": "abc", "X-Retry": 3})),
        "body": literal(json!({"sku": "A-1", "qty": 2})),
        "options": [literal(json!({"query": {"dry": true, "page": 2}}))],
    }));
    let value = continued(run(template, &mut plan, &mut BlockStorage::new()).await);

    let (sent, timeout) = mock.last_request();
    assert_eq!(sent.method, "POST");
    assert_eq!(sent.url.as_str(), "https://api.example.com/orders?dry=true&page=2");
    assert_eq!(sent.headers.get("X-Id").map(String::as_str), Some("abc"));
    assert_eq!(sent.headers.get("X-Retry").map(String::as_str), Some("3"));
    assert_eq!(
        sent.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
    let sent_body: JsonValue = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(sent_body, json!({"sku": "A-1", "qty": 2}));
    let default_timeout = RuntimeConfig::default().transport.timeout_ms;
    assert_eq!(timeout, Duration::from_millis(default_timeout));

    let exchange = value.as_exchange().expect("an exchange");
    assert_eq!(exchange.request.body.to_json(), json!({"sku": "A-1", "qty": 2}));
    assert_eq!(exchange.request.status_code, None);
    assert_eq!(exchange.response.status_code, Some(201));
    assert_eq!(exchange.response.body.to_json(), json!({"id": 9, "status": "created"}));
}

#[tokio::test]
async fn later_option_blocks_win() {
    let mock = MockHttp::replying(204, &[], "");
    let mut plan = plan_storage(services(mock.clone()));
    let template = http(json!({
        "method": string("DELETE"),
        "endpoint": string("https://api.example.com/orders/1"),
        "header": literal(json!({"Accept": "text/plain"})),
        "options": [
            literal(json!({"timeout": 5, "headers": {"X-Client": "a"}})),
            literal(json!({"timeout": 0.5, "headers": {"accept": "application/json"}})),
        ],
    }));
    let value = continued(run(template, &mut plan, &mut BlockStorage::new()).await);

    let (sent, timeout) = mock.last_request();
    assert_eq!(timeout, Duration::from_millis(500));
    // The second map replaced `headers` wholesale; its `accept` overrides the block header.
    assert!(sent.headers.get("X-Client").is_none());
    let accept: Vec<_> = sent
        .headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("accept"))
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(accept, ["application/json"]);
    assert!(sent.body.is_empty());
    assert_eq!(value.as_exchange().unwrap().response.body.to_json(), JsonValue::Null);
}

#[tokio::test]
async fn string_bodies_go_out_raw() {
    let mock = MockHttp::replying(200, &[("Content-Type", "text/plain")], "pong");
    let mut plan = plan_storage(services(mock.clone()));
    let template = http(json!({
        "method": string("PUT"),
        "endpoint": string("https://api.example.com/ping"),
        "body": string("ping"),
    }));
    let value = continued(run(template, &mut plan, &mut BlockStorage::new()).await);
    let (sent, _) = mock.last_request();
    assert_eq!(sent.body, b"ping");
    assert_eq!(
        sent.headers.get("Content-Type").map(String::as_str),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(value.as_exchange().unwrap().response.body.to_json(), json!("pong"));
}

#[tokio::test]
async fn form_bodies_are_urlencoded() {
    let mock = MockHttp::replying(200, &[], "");
    let mut plan = plan_storage(services(mock.clone()));
    let template = http(json!({
        "method": string("POST"),
        "endpoint": string("https://auth.example.com/token"),
        "body": literal(json!({"grant_type": "client_credentials", "scope": "a b"})),
        "options": [literal(json!({"body_format": "form"}))],
    }));
    continued(run(template, &mut plan, &mut BlockStorage::new()).await);
    let (sent, _) = mock.last_request();
    assert_eq!(sent.body, b"grant_type=client_credentials&scope=a%20b");
    assert_eq!(
        sent.headers.get("Content-Type").map(String::as_str),
        Some("application/x-www-form-urlencoded")
    );
}

#[tokio::test]
async fn transport_failures_are_transfer_errors() {
    for failure in [
        HttpError::Timeout,
        HttpError::Network("connection refused".into()),
        HttpError::ResponseTooLarge { max_bytes: 10 },
    ] {
        let mut plan = plan_storage(services(MockHttp::failing(failure.clone())));
        let template = http(json!({
            "method": string("GET"),
            "endpoint": string("https://api.example.com/slow"),
        }));
        let err = run(template, &mut plan, &mut BlockStorage::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transfer, "{failure}");
        assert_eq!(err.report()["type"], "protocol");
        assert_eq!(err.report()["action"], "http");
        assert_eq!(err.report()["message"], failure.to_string());
    }
}

#[tokio::test]
async fn bad_inputs_name_their_field() {
    let cases = [
        (
            json!({"method": integer(1), "endpoint": string("https://a.example.com")}),
            "method",
        ),
        (
            json!({"method": string("GE T"), "endpoint": string("https://a.example.com")}),
            "method",
        ),
        (json!({"method": string("GET"), "endpoint": string("ftp://a.example.com")}), "endpoint"),
        (
            json!({"method": string("GET"), "endpoint": string("https://a.example.com"), "header": literal(json!({"X": [1]}))}),
            "header",
        ),
        (
            json!({"method": string("GET"), "endpoint": string("https://a.example.com"), "options": [string("fast")]}),
            "options",
        ),
        (
            json!({"method": string("GET"), "endpoint": string("https://a.example.com"), "options": [literal(json!({"timeout": "soon"}))]}),
            "options.timeout",
        ),
        (
            json!({"method": string("GET"), "endpoint": string("https://a.example.com"), "options": [literal(json!({"timeout": 1e20}))]}),
            "options.timeout",
        ),
    ];
    for (template, field) in cases {
        let mock = MockHttp::replying(200, &[], "");
        let mut plan = plan_storage(services(mock.clone()));
        let err = run(http(template.clone()), &mut plan, &mut BlockStorage::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{template}");
        assert_eq!(err.report()["field"], field, "{template}");
        assert!(mock.seen.lock().unwrap().is_empty(), "nothing is sent for {template}");
    }
}

#[tokio::test]
async fn soap_wraps_the_payload_in_an_envelope() {
    let mock = MockHttp::replying(200, &[("Content-Type", "text/xml; charset=utf-8")], PRICE_RESPONSE);
    let mut plan = plan_storage(services(mock.clone()));
    let template = soap(json!({
        "endpoint": string("https://soap.example.com/shop"),
        "soapAction": string("urn:shop#GetPrice"),
        "payload": literal(json!({"GetPrice": {"sku": "A-1"}})),
    }));
    let value = continued(run(template, &mut plan, &mut BlockStorage::new()).await);

    let (sent, _) = mock.last_request();
    assert_eq!(sent.method, "POST");
    assert_eq!(
        sent.headers.get("Content-Type").map(String::as_str),
        Some("text/xml; charset=utf-8")
    );
    assert_eq!(
        sent.headers.get("SOAPAction").map(String::as_str),
        Some("\"urn:shop#GetPrice\"")
    );
    let envelope = String::from_utf8(sent.body).unwrap();
    assert!(envelope.contains("http://schemas.xmlsoap.org/soap/envelope/"));
    assert!(envelope.contains("<soap:Body><GetPrice><sku>A-1</sku></GetPrice></soap:Body>"));

    let exchange = value.as_exchange().unwrap();
    assert_eq!(exchange.response.status_code, Some(200));
    assert_eq!(
        exchange.response.body.to_json(),
        json!({"GetPriceResponse": {"Price": "1.5"}})
    );
    assert_eq!(exchange.request.body.to_json(), json!(envelope));
}

#[tokio::test]
async fn soap_headers_replace_author_headers_case_insensitively() {
    let mock = MockHttp::replying(200, &[("Content-Type", "text/xml")], PRICE_RESPONSE);
    let mut plan = plan_storage(services(mock.clone()));
    let template = soap(json!({
        "endpoint": string("https://soap.example.com/shop"),
        "soapAction": string("GetPrice"),
        "header": literal(json!({"content-type": "application/json", "soapaction": "x", "X-Trace": "t-1"})),
    }));
    continued(run(template, &mut plan, &mut BlockStorage::new()).await);

    let (sent, _) = mock.last_request();
    let content_types: Vec<_> = sent
        .headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(content_types, vec!["text/xml; charset=utf-8"]);
    let actions = sent
        .headers
        .keys()
        .filter(|k| k.eq_ignore_ascii_case("soapaction"))
        .count();
    assert_eq!(actions, 1);
    assert_eq!(sent.headers.get("X-Trace").map(String::as_str), Some("t-1"));
}

#[tokio::test]
async fn huge_soap_timeouts_are_invalid_options() {
    let mock = MockHttp::replying(200, &[], "");
    let mut plan = plan_storage(services(mock.clone()));
    let template = soap(json!({
        "endpoint": string("https://soap.example.com/shop"),
        "options": [literal(json!({"timeout": 1e20}))],
    }));
    let err = run(template, &mut plan, &mut BlockStorage::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.report()["field"], "options.timeout");
    assert!(mock.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn soap_12_carries_the_action_in_the_content_type() {
    let mock = MockHttp::replying(200, &[("Content-Type", "application/soap+xml")], PRICE_RESPONSE);
    let mut plan = plan_storage(services(mock.clone()));
    let template = soap(json!({
        "endpoint": string("https://soap.example.com/shop"),
        "soapAction": string("GetPrice"),
        "payload": string("<GetPrice><sku>A-1</sku></GetPrice>"),
        "options": [literal(json!({"version": "1.2"}))],
    }));
    continued(run(template, &mut plan, &mut BlockStorage::new()).await);

    let (sent, _) = mock.last_request();
    assert!(sent.headers.get("SOAPAction").is_none());
    assert_eq!(
        sent.headers.get("Content-Type").map(String::as_str),
        Some("application/soap+xml; charset=utf-8; action=\"GetPrice\"")
    );
    let envelope = String::from_utf8(sent.body).unwrap();
    assert!(envelope.contains("http://www.w3.org/2003/05/soap-envelope"));
    assert!(envelope.contains("<GetPrice><sku>A-1</sku></GetPrice>"));
}

#[tokio::test]
async fn soap_faults_are_ordinary_responses() {
    let fault = r#"<s:Envelope xmlns:s="x"><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>bad sku</faultstring></s:Fault></s:Body></s:Envelope>"#;
    let mock = MockHttp::replying(500, &[("Content-Type", "text/xml")], fault);
    let mut plan = plan_storage(services(mock));
    let template = soap(json!({"endpoint": string("https://soap.example.com/shop")}));
    let value = continued(run(template, &mut plan, &mut BlockStorage::new()).await);
    let response = &value.as_exchange().unwrap().response;
    assert_eq!(response.status_code, Some(500));
    assert_eq!(
        response.body.to_json(),
        json!({"Fault": {"faultcode": "s:Client", "faultstring": "bad sku"}})
    );
}

#[tokio::test]
async fn malformed_soap_responses_are_transfer_errors() {
    let mock = MockHttp::replying(200, &[("Content-Type", "text/xml")], "<Envelope><Body>");
    let mut plan = plan_storage(services(mock));
    let template = soap(json!({"endpoint": string("https://soap.example.com/shop")}));
    let err = run(template, &mut plan, &mut BlockStorage::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert_eq!(err.report()["action"], "soap");
}

#[tokio::test]
async fn soap_rejects_unknown_versions() {
    let mock = MockHttp::replying(200, &[], "");
    let mut plan = plan_storage(services(mock));
    let template = soap(json!({
        "endpoint": string("https://soap.example.com/shop"),
        "options": [literal(json!({"version": "2.0"}))],
    }));
    let err = run(template, &mut plan, &mut BlockStorage::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.report()["field"], "options.version");
}
