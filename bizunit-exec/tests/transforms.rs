mod support;

use bizunit_core::{ErrorKind, Value};
use bizunit_exec::blocks::DateTimeSupport;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};

use support::{block, continued, integer, literal, run_offline, string};

fn parse(value: &str) -> JsonValue {
    block("datetime", "parse", json!({"value": string(value)}))
}

fn parse_with(value: &str, format: &str) -> JsonValue {
    block("datetime", "parse", json!({"value": string(value), "format": format}))
}

fn modify(datetime: JsonValue, amount: i64, unit: &str) -> JsonValue {
    block(
        "datetime",
        "modify",
        json!({"datetime": datetime, "amount": integer(amount), "unit": unit}),
    )
}

fn rfc3339(value: &Value) -> String {
    value
        .as_handle()
        .and_then(|h| h.downcast_ref::<DateTimeSupport>())
        .map(|dt| dt.0.to_rfc3339())
        .expect("a datetime handle")
}

#[tokio::test]
async fn json_encode_and_decode() {
    let compact = block("codec", "json-encode", json!({"value": literal(json!({"b": 1, "a": [true]}))}));
    assert_eq!(continued(run_offline(compact).await), Value::from(r#"{"b":1,"a":[true]}"#));

    let pretty = block("codec", "json-encode", json!({"value": literal(json!({"a": 1})), "pretty": true}));
    assert_eq!(continued(run_offline(pretty).await), Value::from("{\n  \"a\": 1\n}"));

    let decode = block("codec", "json-decode", json!({"value": string(r#"{"items": [1, 2.5, null]}"#)}));
    assert_eq!(
        continued(run_offline(decode).await).to_json(),
        json!({"items": [1, 2.5, null]})
    );
}

#[tokio::test]
async fn json_decode_rejects_garbage() {
    let decode = block("codec", "json-decode", json!({"value": string("{oops")}));
    let err = run_offline(decode).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.report()["field"], "value");
    assert!(err.to_string().contains("invalid JSON"));
}

#[tokio::test]
async fn xml_encode_and_decode() {
    let encode = block(
        "codec",
        "xml-encode",
        json!({"value": literal(json!({"id": 7, "tags": ["a", "b"]})), "root": "order"}),
    );
    assert_eq!(
        continued(run_offline(encode).await),
        Value::from("<order><id>7</id><tags>a</tags><tags>b</tags></order>")
    );

    let decode = block(
        "codec",
        "xml-decode",
        json!({"value": string(r#"<order id="7"><tag>a</tag><tag>b</tag></order>"#)}),
    );
    assert_eq!(
        continued(run_offline(decode).await).to_json(),
        json!({"order": {"@id": "7", "tag": ["a", "b"]}})
    );
}

#[tokio::test]
async fn xml_failures_are_invalid_arguments() {
    let bad_doc = block("codec", "xml-decode", json!({"value": string("<a><b></a>")}));
    let err = run_offline(bad_doc).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let bad_name = block("codec", "xml-encode", json!({"value": literal(json!({"1st": 1, "x": 2}))}));
    let err = run_offline(bad_name).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.report()["field"], "value");
}

#[tokio::test]
async fn datetimes_are_opaque_handles() {
    let value = continued(run_offline(parse("2024-03-01T10:00:00+02:00")).await);
    assert_eq!(value.type_name(), "handle");
    assert_eq!(rfc3339(&value), "2024-03-01T10:00:00+02:00");
    assert_eq!(value.to_json(), json!("2024-03-01T10:00:00+02:00"));

    let naive = continued(run_offline(parse_with("01/03/2024 10:30", "%d/%m/%Y %H:%M")).await);
    assert_eq!(rfc3339(&naive), "2024-03-01T10:30:00+00:00");
}

#[tokio::test]
async fn unparseable_datetimes_are_invalid_arguments() {
    let err = run_offline(parse("yesterday")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.report()["field"], "value");
}

#[tokio::test]
async fn modify_shifts_by_calendar_units() {
    let base = || parse("2024-01-31T23:30:00+00:00");
    let cases = [
        (modify(base(), 1, "month"), "2024-02-29T23:30:00+00:00"),
        (modify(base(), -1, "years"), "2023-01-31T23:30:00+00:00"),
        (modify(base(), 45, "minutes"), "2024-02-01T00:15:00+00:00"),
        (modify(base(), -2, "weeks"), "2024-01-17T23:30:00+00:00"),
    ];
    for (template, expected) in cases {
        assert_eq!(rfc3339(&continued(run_offline(template).await)), expected);
    }
}

#[tokio::test]
async fn modify_requires_a_datetime() {
    let err = run_offline(modify(string("2024-01-01"), 1, "days")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.report()["field"], "datetime");
}

#[tokio::test]
async fn format_renders_with_strftime() {
    let format = block(
        "datetime",
        "format",
        json!({"datetime": parse("2024-03-01T10:05:00+09:00"), "format": "%Y/%m/%d %H:%M %z"}),
    );
    assert_eq!(continued(run_offline(format).await), Value::from("2024/03/01 10:05 +0900"));

    let default = block("datetime", "format", json!({"datetime": parse("2024-03-01T10:05:00Z")}));
    assert_eq!(continued(run_offline(default).await), Value::from("2024-03-01T10:05:00+00:00"));
}

#[tokio::test]
async fn diff_truncates_toward_zero() {
    let diff = |from: &str, to: &str, unit: &str| {
        block("datetime", "diff", json!({"from": parse(from), "to": parse(to), "unit": unit}))
    };
    let cases = [
        (diff("2024-03-01T00:00:00Z", "2024-03-03T12:00:00Z", "days"), 2),
        (diff("2024-03-03T12:00:00Z", "2024-03-01T00:00:00Z", "days"), -2),
        (diff("2024-03-01T00:00:00Z", "2024-03-01T01:30:00+01:00", "minutes"), 30),
        (diff("2024-03-01T00:00:00Z", "2024-03-01T00:00:59Z", "minute"), 0),
    ];
    for (template, expected) in cases {
        assert_eq!(continued(run_offline(template).await), Value::Int(expected));
    }
}

#[tokio::test]
async fn now_honors_the_offset() {
    let before = Utc::now();
    let value = continued(run_offline(block("datetime", "now", json!({"offset": "+09:00"}))).await);
    let text = rfc3339(&value);
    assert!(text.ends_with("+09:00"), "{text}");
    let parsed = DateTime::parse_from_rfc3339(&text).unwrap();
    assert!(parsed >= before - chrono::Duration::seconds(1));
}
