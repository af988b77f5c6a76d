use std::time::Instant;

use bizunit_core::services::PlanServices;
use bizunit_core::{
    AccountManager, BlockError, BlockStorage, ErrorKind, Flow, HeaderMap, OriginRequest, Plan,
    PlanResponse, PlanStorage, Value, ValueMap,
};
use tracing::Instrument;
use uuid::Uuid;

/// How one execution of a plan ended.
#[derive(Debug)]
pub enum PlanOutcome {
    /// A block chose the response.
    Responded(PlanResponse),
    /// Every root block ran; carries the operator storage.
    Completed(ValueMap),
    Failed(BlockError),
}

impl PlanOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PlanOutcome::Failed(_))
    }

    /// The response to serve. Failures render their report, never the raw cause of a runtime
    /// error.
    pub fn into_response(self) -> PlanResponse {
        match self {
            PlanOutcome::Responded(response) => response,
            PlanOutcome::Completed(_) => PlanResponse::new(204, HeaderMap::new(), Value::Null),
            PlanOutcome::Failed(err) => {
                let mut header = HeaderMap::new();
                header.insert("Content-Type".into(), "application/json".into());
                PlanResponse::new(
                    status_for(err.kind()),
                    header,
                    Value::from_json(err.report()),
                )
            }
        }
    }
}

pub fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::InvalidArgument => 400,
        ErrorKind::Transfer => 502,
        ErrorKind::Storage => 503,
        ErrorKind::Template | ErrorKind::Runtime => 500,
    }
}

/// Result of [`PlanRunner::run`] plus the id its log lines carry.
#[derive(Debug)]
pub struct PlanRun {
    pub run_id: Uuid,
    pub outcome: PlanOutcome,
}

/// Executes built plans. One runner serves any number of concurrent runs; each run gets its own
/// [`PlanStorage`].
#[derive(Debug, Clone)]
pub struct PlanRunner {
    services: PlanServices,
}

impl PlanRunner {
    pub fn new(services: PlanServices) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &PlanServices {
        &self.services
    }

    pub async fn run(&self, plan: &Plan, origin: OriginRequest, account: AccountManager) -> PlanRun {
        let mut storage = PlanStorage::new(self.services.clone(), origin, account);
        let run_id = storage.run_id();
        let span = tracing::info_span!("plan", plan = plan.name(), %run_id);
        let outcome = execute(plan, &mut storage).instrument(span).await;
        PlanRun { run_id, outcome }
    }
}

async fn execute(plan: &Plan, storage: &mut PlanStorage) -> PlanOutcome {
    let started = Instant::now();
    let mut blocks = BlockStorage::new();
    storage.logger().info("plan started");

    let mut result = Ok(None);
    for node in plan.blocks() {
        match node.run(storage, &mut blocks).await {
            Ok(Flow::Continue(_)) => {}
            Ok(Flow::Respond(response)) => {
                result = Ok(Some(response));
                break;
            }
            Err(err) => {
                result = Err(err);
                break;
            }
        }
    }
    storage.close_resources().await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(Some(response)) => {
            tracing::info!(status = response.status, elapsed_ms, "plan responded");
            PlanOutcome::Responded(response)
        }
        Ok(None) => {
            tracing::info!(elapsed_ms, "plan completed");
            PlanOutcome::Completed(storage.operator_storage_map().clone())
        }
        Err(err) => {
            // Runtime errors were already logged in full where they were raised.
            if err.kind() != ErrorKind::Runtime {
                if let Some(key) = err.key() {
                    storage.logger().error(key, &err.to_string());
                }
            }
            tracing::warn!(kind = err.kind().as_str(), elapsed_ms, "plan failed");
            PlanOutcome::Failed(err)
        }
    }
}
