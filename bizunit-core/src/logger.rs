use std::time::Duration;

use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::config::AppEnv;
use crate::error::BlockKey;

/// Per-execution logger handed to every block through `PlanStorage`.
///
/// Thin wrapper over `tracing`; every event carries the execution's `run_id` so one plan run
/// can be followed across interleaved concurrent executions.
#[derive(Debug, Clone)]
pub struct PlanLogger {
    run_id: Uuid,
    env: AppEnv,
}

impl PlanLogger {
    pub fn new(run_id: Uuid, env: AppEnv) -> Self {
        Self { run_id, env }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn env(&self) -> AppEnv {
        self.env
    }

    pub fn debug(&self, message: &str, detail: &JsonValue) {
        tracing::debug!(run_id = %self.run_id, detail = %detail, "{message}");
    }

    pub fn info(&self, message: &str) {
        tracing::info!(run_id = %self.run_id, "{message}");
    }

    pub fn error(&self, key: &BlockKey, message: &str) {
        tracing::error!(run_id = %self.run_id, block = %key, "{message}");
    }

    /// Full detail of an uncategorized failure, including its source chain. This is the only
    /// place the raw text of such a failure is recorded.
    pub fn exception(&self, key: &BlockKey, err: &(dyn std::error::Error + 'static)) {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        tracing::error!(
            run_id = %self.run_id,
            block = %key,
            error = %err,
            caused_by = ?chain,
            "uncategorized failure inside block"
        );
    }

    pub fn query(&self, statement: &str, params: &[JsonValue], elapsed: Duration) {
        tracing::info!(
            target: "bizunit::query",
            run_id = %self.run_id,
            statement,
            params = %JsonValue::Array(params.to_vec()),
            elapsed_ms = elapsed.as_millis() as u64,
            "query"
        );
    }

    /// Access-log line for one protocol exchange.
    pub fn access(&self, line: &str) {
        tracing::info!(target: "bizunit::access", run_id = %self.run_id, "{line}");
    }
}
