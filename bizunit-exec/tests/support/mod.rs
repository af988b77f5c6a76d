//! Shared mocks and template shorthands for the block catalog tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bizunit_core::services::{
    HttpClient, HttpError, HttpRequestParts, HttpResponseParts, PlanServices, RdbResource,
    RedisResource, ResourceError, ResourceProvider,
};
use bizunit_core::{
    AccountManager, BlockResult, BlockStorage, Flow, HeaderMap, OriginRequest, PlanResponse,
    PlanStorage, RuntimeConfig, Value,
};
use bizunit_exec::default_factory;
use serde_json::{json, Value as JsonValue};

/// Records every request and answers with a fixed response or error.
pub struct MockHttp {
    reply: Result<HttpResponseParts, HttpError>,
    pub seen: Mutex<Vec<(HttpRequestParts, Duration)>>,
}

impl MockHttp {
    pub fn replying(status: u16, headers: &[(&str, &str)], body: &str) -> Arc<Self> {
        let headers: HeaderMap = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(Self {
            reply: Ok(HttpResponseParts {
                status,
                headers,
                body: body.as_bytes().to_vec(),
            }),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn json(status: u16, body: JsonValue) -> Arc<Self> {
        Self::replying(status, &[("Content-Type", "application/json")], &body.to_string())
    }

    pub fn failing(err: HttpError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn last_request(&self) -> (HttpRequestParts, Duration) {
        self.seen.lock().unwrap().last().cloned().expect("a request was sent")
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn send(
        &self,
        req: HttpRequestParts,
        timeout: Duration,
        _max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        self.seen.lock().unwrap().push((req, timeout));
        self.reply.clone()
    }
}

/// Answers every query with `rows` and records statements.
#[derive(Default)]
pub struct MemoryRdb {
    pub rows: Vec<JsonValue>,
    pub statements: Mutex<Vec<(String, Vec<JsonValue>)>>,
    pub closed: Mutex<bool>,
}

#[async_trait]
impl RdbResource for MemoryRdb {
    async fn query(&self, sql: &str, params: &[JsonValue]) -> Result<Vec<JsonValue>, ResourceError> {
        self.statements.lock().unwrap().push((sql.to_string(), params.to_vec()));
        if sql.contains("broken") {
            return Err(ResourceError::Driver("syntax error at or near \"broken\"".into()));
        }
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &str, params: &[JsonValue]) -> Result<u64, ResourceError> {
        self.statements.lock().unwrap().push((sql.to_string(), params.to_vec()));
        Ok(self.rows.len() as u64)
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

#[derive(Default)]
pub struct MemoryRedis {
    pub data: Mutex<HashMap<String, (String, u64)>>,
}

#[async_trait]
impl RedisResource for MemoryRedis {
    async fn get_data(&self, key: &str) -> Result<Option<String>, ResourceError> {
        Ok(self.data.lock().unwrap().get(key).map(|(v, _)| v.clone()))
    }

    async fn set_data_with_expire(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ResourceError> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl_secs));
        Ok(())
    }

    async fn exist(&self, key: &str) -> Result<bool, ResourceError> {
        Ok(self.data.lock().unwrap().contains_key(key))
    }

    async fn del(&self, key: &str) -> Result<u64, ResourceError> {
        Ok(u64::from(self.data.lock().unwrap().remove(key).is_some()))
    }

    async fn close(&self) {}
}

pub struct MemoryResources {
    pub rdb: Arc<MemoryRdb>,
    pub redis: Arc<MemoryRedis>,
}

impl ResourceProvider for MemoryResources {
    fn rdb(&self) -> Option<Arc<dyn RdbResource>> {
        Some(self.rdb.clone())
    }

    fn redis(&self) -> Option<Arc<dyn RedisResource>> {
        Some(self.redis.clone())
    }
}

pub fn services(http: Arc<dyn HttpClient>) -> PlanServices {
    PlanServices::new(Arc::new(RuntimeConfig::default()), http)
}

pub fn offline() -> PlanServices {
    services(MockHttp::failing(HttpError::Other("network disabled in tests".into())))
}

pub fn plan_storage(services: PlanServices) -> PlanStorage {
    PlanStorage::new(services, OriginRequest::default(), AccountManager::anonymous())
}

/// Build `template` with the full catalog and run it once.
pub async fn run(template: JsonValue, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
    let node = default_factory().build(&template).expect("template builds");
    node.run(plan, storage).await
}

pub async fn run_offline(template: JsonValue) -> BlockResult {
    let mut plan = plan_storage(offline());
    run(template, &mut plan, &mut BlockStorage::new()).await
}

pub fn block(r#type: &str, action: &str, template: JsonValue) -> JsonValue {
    json!({"type": r#type, "action": action, "template": template})
}

pub fn string(value: &str) -> JsonValue {
    block("primitive", "string", json!({"value": value}))
}

pub fn integer(value: i64) -> JsonValue {
    block("primitive", "integer", json!({"value": value}))
}

pub fn literal(value: JsonValue) -> JsonValue {
    block("primitive", "literal", json!({"value": value}))
}

pub fn continued(result: BlockResult) -> Value {
    match result {
        Ok(Flow::Continue(value)) => value,
        other => panic!("expected a value, got {other:?}"),
    }
}

pub fn responded(result: BlockResult) -> PlanResponse {
    match result {
        Ok(Flow::Respond(response)) => response,
        other => panic!("expected a response, got {other:?}"),
    }
}
