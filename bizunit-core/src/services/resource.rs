use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ResourceError {
    #[error("{0} resource is not configured")]
    NotConfigured(&'static str),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Driver(String),
}

/// Relational storage handle. Connects lazily on first use and stays connected until `close`.
#[async_trait]
pub trait RdbResource: Send + Sync {
    /// Rows as ordered JSON objects.
    async fn query(&self, sql: &str, params: &[JsonValue]) -> Result<Vec<JsonValue>, ResourceError>;

    /// Rows affected.
    async fn execute(&self, sql: &str, params: &[JsonValue]) -> Result<u64, ResourceError>;

    async fn close(&self);
}

#[async_trait]
pub trait RedisResource: Send + Sync {
    async fn get_data(&self, key: &str) -> Result<Option<String>, ResourceError>;

    /// `ttl_secs == 0` stores without expiry.
    async fn set_data_with_expire(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ResourceError>;

    async fn exist(&self, key: &str) -> Result<bool, ResourceError>;

    /// Number of keys removed.
    async fn del(&self, key: &str) -> Result<u64, ResourceError>;

    async fn close(&self);
}

/// Hands out fresh, not-yet-connected storage handles for each plan execution.
pub trait ResourceProvider: Send + Sync {
    fn rdb(&self) -> Option<Arc<dyn RdbResource>>;
    fn redis(&self) -> Option<Arc<dyn RedisResource>>;
}

/// Provider for deployments without storage drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceProvider for NoResources {
    fn rdb(&self) -> Option<Arc<dyn RdbResource>> {
        None
    }

    fn redis(&self) -> Option<Arc<dyn RedisResource>> {
        None
    }
}
