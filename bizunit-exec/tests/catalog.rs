mod support;

use std::collections::BTreeSet;

use bizunit_core::{parse_plan_str, validate_plan, ErrorKind, PlanFormat};
use bizunit_exec::default_factory;
use serde_json::{json, Value as JsonValue};

use support::{block, continued, integer, literal, run_offline, string};

/// One template per registered action.
fn samples() -> Vec<JsonValue> {
    let http = block(
        "protocol",
        "http",
        json!({
            "method": string("GET"),
            "endpoint": string("https://api.example.com/orders"),
            "options": [literal(json!({"timeout": 5}))],
        }),
    );
    vec![
        block("operator", "request", json!({"id": "in", "header": ["X-Id"], "body": ["sku"]})),
        block("operator", "response", json!({"id": "out", "context": block("reference", "operator", json!({"id": "in"}))})),
        block(
            "operator",
            "restful",
            json!({
                "id": "orders",
                "protocol": http,
                "responses": [
                    block("operator", "response-shape", json!({"statusCode": 200, "header": [], "body": ["id"]})),
                    block("operator", "response-shape", json!({"statusCode": null})),
                ],
            }),
        ),
        block("operator", "response-shape", json!({"statusCode": 404, "header": ["X-Trace"], "body": []})),
        http.clone(),
        block(
            "protocol",
            "soap",
            json!({
                "endpoint": string("https://soap.example.com/price"),
                "soapAction": string("GetPrice"),
                "payload": literal(json!({"GetPrice": {"sku": "A-1"}})),
            }),
        ),
        string("hello"),
        integer(42),
        block("primitive", "float", json!({"value": 1.5})),
        block("primitive", "boolean", json!({"value": true})),
        block("primitive", "null", json!({})),
        literal(json!({"nested": [1, 2, {"x": null}]})),
        block("primitive", "map", json!({"entries": {"a": integer(1), "b": string("two")}})),
        block("primitive", "list", json!({"items": [integer(1), string("x")]})),
        block("primitive", "concat", json!({"items": [string("a"), integer(1)], "separator": "-"})),
        block("reference", "operator", json!({"id": "in", "path": ["body", "sku"]})),
        block("reference", "block", json!({"name": "cart", "path": ["items", 0]})),
        block("reference", "variable", json!({"name": "total", "path": []})),
        block("reference", "origin", json!({"path": ["query", "page"]})),
        block("reference", "meta", json!({"path": ["runId"]})),
        block("flow", "sequence", json!({"blocks": [integer(1), integer(2)]})),
        block("flow", "scope", json!({"blocks": [block("flow", "let", json!({"name": "x", "value": integer(1)}))]})),
        block("flow", "let", json!({"name": "x", "value": integer(1)})),
        block("flow", "assign", json!({"name": "x", "value": integer(2)})),
        block("flow", "store", json!({"name": "cart", "value": literal(json!({"items": []}))})),
        block("arraylist", "get", json!({"keys": [string("cart"), string("items"), integer(0)]})),
        block("arraylist", "set", json!({"keys": [string("cart"), string("items"), integer(0)], "value": string("x")})),
        block("arraylist", "remove", json!({"keys": [string("cart"), string("items"), integer(0)]})),
        block("arraylist", "exists", json!({"keys": [string("cart")]})),
        block("arraylist", "count", json!({"keys": [string("cart"), string("items")]})),
        block("datetime", "now", json!({"offset": "+09:00"})),
        block("datetime", "parse", json!({"value": string("2024-03-01 10:00"), "format": "%Y-%m-%d %H:%M"})),
        block("datetime", "format", json!({"datetime": block("datetime", "now", json!({})), "format": "%Y"})),
        block("datetime", "modify", json!({"datetime": block("datetime", "now", json!({})), "amount": integer(1), "unit": "days"})),
        block("datetime", "diff", json!({"from": block("datetime", "now", json!({})), "to": block("datetime", "now", json!({})), "unit": "hours"})),
        block("codec", "json-encode", json!({"value": literal(json!([1])), "pretty": true})),
        block("codec", "json-decode", json!({"value": string("[1]")})),
        block("codec", "xml-encode", json!({"value": literal(json!({"a": 1})), "root": "doc"})),
        block("codec", "xml-decode", json!({"value": string("<a>1</a>")})),
        block("driver", "rdb-query", json!({"sql": string("select 1"), "params": []})),
        block("driver", "rdb-execute", json!({"sql": string("delete from t where id = $1"), "params": [integer(3)]})),
        block("driver", "redis-get", json!({"key": string("k")})),
        block("driver", "redis-set", json!({"key": string("k"), "value": string("v"), "ttl": integer(60)})),
        block("driver", "redis-exist", json!({"key": string("k")})),
        block("driver", "redis-del", json!({"key": string("k")})),
        block("oauth2", "authorize", json!({})),
        block("oauth2", "token", json!({"request": literal(json!({"grant_type": "client_credentials"}))})),
    ]
}

#[test]
fn every_action_has_a_sample() {
    let factory = default_factory();
    let registered: BTreeSet<(String, String)> = factory
        .families()
        .flat_map(|family| {
            family
                .actions()
                .map(|action| (family.name().to_string(), action.to_string()))
                .collect::<Vec<_>>()
        })
        .collect();
    let sampled: BTreeSet<(String, String)> = samples()
        .iter()
        .map(|t| (t["type"].as_str().unwrap().to_string(), t["action"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(registered, sampled);
}

#[test]
fn serialized_templates_rebuild_to_the_same_tree() {
    let factory = default_factory();
    for template in samples() {
        let first = factory
            .build(&template)
            .unwrap_or_else(|e| panic!("{} failed to build: {e}", template))
            .to_json();
        let second = factory.build(&first).expect("canonical form builds").to_json();
        assert_eq!(first, second, "not a fixed point: {template}");
        assert_eq!(first["type"], template["type"]);
        assert_eq!(first["action"], template["action"]);
    }
}

#[test]
fn extra_survives_serialization() {
    let mut template = string("x");
    template["extra"] = json!({"label": "greeting", "owner": "billing"});
    let node = default_factory().build(&template).unwrap();
    assert_eq!(node.to_json()["extra"], json!({"label": "greeting", "owner": "billing"}));
}

#[test]
fn unknown_blocks_are_template_errors() {
    let factory = default_factory();
    for template in [
        block("primitive", "decimal", json!({"value": 1})),
        block("teleport", "now", json!({})),
        json!({"type": "primitive"}),
    ] {
        let err = factory.build(&template).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Template, "{template}");
    }
}

#[test]
fn malformed_fields_are_template_errors() {
    let factory = default_factory();
    for template in [
        block("primitive", "integer", json!({"value": "12"})),
        block("primitive", "string", json!({})),
        block("operator", "request", json!({"id": "in", "header": "X-Id"})),
        block("operator", "restful", json!({"id": "r", "protocol": integer(1), "responses": [integer(200)]})),
        block("datetime", "diff", json!({"from": integer(1), "to": integer(2), "unit": "months"})),
        block("datetime", "modify", json!({"datetime": integer(1), "amount": integer(1), "unit": "fortnights"})),
        block("datetime", "format", json!({"datetime": integer(1), "format": "%Q%"})),
        block("codec", "json-encode", json!({"value": integer(1), "pretty": "yes"})),
        block("reference", "block", json!({"name": "cart", "path": [{"x": 1}]})),
        block("flow", "sequence", json!({"blocks": [{"type": "primitive"}]})),
    ] {
        let err = factory.build(&template).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Template, "{template}");
    }
}

fn plan_with(blocks: Vec<JsonValue>) -> bizunit_core::PlanDocument {
    let doc = json!({"name": "p", "blocks": blocks});
    parse_plan_str(&doc.to_string(), PlanFormat::Json).unwrap().document
}

#[test]
fn map_entries_named_type_validate_like_they_load() {
    let store = block(
        "flow",
        "store",
        json!({
            "name": "payment",
            "value": block("primitive", "map", json!({"entries": {"type": string("card"), "amount": integer(5)}})),
        }),
    );
    let doc = plan_with(vec![store.clone()]);
    default_factory().build(&store).unwrap();
    validate_plan(&doc, &default_factory()).unwrap();
}

#[test]
fn validation_follows_every_catalog_child_field() {
    let doc = plan_with(vec![
        block("primitive", "map", json!({"entries": {"type": block("primitive", "nope", json!({}))}})),
        block(
            "operator",
            "restful",
            json!({
                "id": "r",
                "protocol": block("protocol", "http", json!({"method": string("GET"), "endpoint": string("https://a.example.com")})),
                "responses": [block("operator", "response-shape", json!({"statusCode": 99}))],
            }),
        ),
        block("flow", "sequence", json!({"blocks": [string("ok"), block("primitive", "string", json!({}))]})),
    ]);
    let err = validate_plan(&doc, &default_factory()).unwrap_err();
    let paths: Vec<_> = err.violations.iter().map(|v| v.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "$.blocks[0].template.entries.type",
            "$.blocks[1]",
            "$.blocks[2].template.blocks[1]",
        ]
    );
    assert!(err.violations[1].message.contains("statusCode"), "{:?}", err.violations[1]);
}

#[tokio::test]
async fn primitives_yield_their_values() {
    let cases = [
        (string("hi"), json!("hi")),
        (integer(-3), json!(-3)),
        (block("primitive", "float", json!({"value": 0.25})), json!(0.25)),
        (block("primitive", "boolean", json!({"value": false})), json!(false)),
        (block("primitive", "null", json!({})), JsonValue::Null),
        (literal(json!({"a": [1, "b"]})), json!({"a": [1, "b"]})),
        (
            block("primitive", "map", json!({"entries": {"z": integer(1), "a": string("x")}})),
            json!({"z": 1, "a": "x"}),
        ),
        (
            block("primitive", "list", json!({"items": [integer(1), block("primitive", "null", json!({}))]})),
            json!([1, null]),
        ),
        (
            block("primitive", "concat", json!({"items": [string("order"), integer(7), block("primitive", "boolean", json!({"value": true}))], "separator": ":"})),
            json!("order:7:true"),
        ),
        (block("primitive", "concat", json!({"items": [string("a"), string("b")]})), json!("ab")),
    ];
    for (template, expected) in cases {
        let value = continued(run_offline(template.clone()).await);
        assert_eq!(value.to_json(), expected, "{template}");
    }
}

#[tokio::test]
async fn concat_rejects_structured_items() {
    let err = run_offline(block(
        "primitive",
        "concat",
        json!({"items": [string("a"), literal(json!([1]))]}),
    ))
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.report()["field"], "items");
}

#[tokio::test]
async fn child_of_wrong_type_names_the_field() {
    let err = run_offline(block(
        "codec",
        "json-decode",
        json!({"value": integer(5)}),
    ))
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.report()["field"], "value");
    assert_eq!(err.report()["type"], "codec");
    assert_eq!(err.report()["action"], "json-decode");
}
