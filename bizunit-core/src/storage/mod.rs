//! Per-execution state shared by reference across the whole block tree.

mod block_storage;
mod session;
mod stack;

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::logger::PlanLogger;
use crate::services::{AccessController, HttpClient, PlanServices, RdbResource, RedisResource};
use crate::value::{Value, ValueMap};

pub use block_storage::BlockStorage;
pub use session::{AccountManager, OriginRequest, TransactionManager};
pub use stack::StackManager;

/// Execution context for one plan run. Never shared between concurrent runs.
pub struct PlanStorage {
    services: PlanServices,
    logger: PlanLogger,
    operator_storage: ValueMap,
    stack: StackManager,
    origin: OriginRequest,
    account: AccountManager,
    transaction: TransactionManager,
    rdb: Option<Arc<dyn RdbResource>>,
    redis: Option<Arc<dyn RedisResource>>,
}

impl PlanStorage {
    pub fn new(services: PlanServices, origin: OriginRequest, account: AccountManager) -> Self {
        let run_id = Uuid::new_v4();
        let logger = PlanLogger::new(run_id, services.config.app_env);
        let rdb = services.resources.rdb();
        let redis = services.resources.redis();
        Self {
            services,
            logger,
            operator_storage: ValueMap::new(),
            stack: StackManager::new(),
            origin,
            account,
            transaction: TransactionManager::begin(),
            rdb,
            redis,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.logger.run_id()
    }

    pub fn logger(&self) -> &PlanLogger {
        &self.logger
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.services.config
    }

    pub fn services(&self) -> &PlanServices {
        &self.services
    }

    pub fn http(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.services.http)
    }

    pub fn access(&self) -> Option<Arc<dyn AccessController>> {
        self.services.access.clone()
    }

    pub fn rdb(&self) -> Option<Arc<dyn RdbResource>> {
        self.rdb.clone()
    }

    pub fn redis(&self) -> Option<Arc<dyn RedisResource>> {
        self.redis.clone()
    }

    /// Register an operator's output under its id. Ids are expected to be written once; a
    /// second write replaces the first and is logged.
    pub fn add_operator_storage(&mut self, id: impl Into<String>, value: Value) {
        let id = id.into();
        if self.operator_storage.contains_key(&id) {
            self.logger.debug(
                "operator storage entry overwritten",
                &serde_json::json!({ "id": id }),
            );
        }
        self.operator_storage.insert(id, value);
    }

    pub fn operator_storage(&self, id: &str) -> Option<&Value> {
        self.operator_storage.get(id)
    }

    pub fn operator_storage_map(&self) -> &ValueMap {
        &self.operator_storage
    }

    pub fn stack_manager(&self) -> &StackManager {
        &self.stack
    }

    pub fn stack_manager_mut(&mut self) -> &mut StackManager {
        &mut self.stack
    }

    pub fn origin(&self) -> &OriginRequest {
        &self.origin
    }

    pub fn account(&self) -> &AccountManager {
        &self.account
    }

    pub fn transaction(&self) -> &TransactionManager {
        &self.transaction
    }

    /// Execution metadata exposed to plans.
    pub fn meta(&self) -> Value {
        let mut map = ValueMap::new();
        map.insert("runId".into(), Value::String(self.run_id().to_string()));
        map.insert("env".into(), Value::String(self.config().app_env.to_string()));
        map.insert("transaction".into(), self.transaction.to_value());
        map.insert("account".into(), self.account.to_value());
        Value::Map(map)
    }

    /// Close any storage handle this execution opened.
    pub async fn close_resources(&self) {
        if let Some(rdb) = &self.rdb {
            rdb.close().await;
        }
        if let Some(redis) = &self.redis {
            redis.close().await;
        }
    }
}

impl fmt::Debug for PlanStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanStorage")
            .field("run_id", &self.run_id())
            .field("operator_storage", &self.operator_storage)
            .field("stack", &self.stack)
            .field("origin", &self.origin)
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}
