use std::sync::Arc;

use bizunit_core::config::ResourcesConfig;
use bizunit_core::services::{RdbResource, RedisResource, ResourceProvider};

use crate::postgres::PostgresRdb;
use crate::redis_store::RedisStore;

/// Hands every plan execution its own lazily connected Postgres and Redis handles.
#[derive(Debug, Clone, Default)]
pub struct PostgresResources {
    rdb_url: Option<String>,
    redis_url: Option<String>,
}

impl PostgresResources {
    pub fn new(rdb_url: Option<String>, redis_url: Option<String>) -> Self {
        Self { rdb_url, redis_url }
    }

    /// Expects secret references in `config` to be resolved already.
    pub fn from_config(config: &ResourcesConfig) -> Self {
        Self::new(config.rdb_url.clone(), config.redis_url.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.rdb_url.is_none() && self.redis_url.is_none()
    }
}

impl ResourceProvider for PostgresResources {
    fn rdb(&self) -> Option<Arc<dyn RdbResource>> {
        self.rdb_url
            .as_ref()
            .map(|url| Arc::new(PostgresRdb::new(url.clone())) as Arc<dyn RdbResource>)
    }

    fn redis(&self) -> Option<Arc<dyn RedisResource>> {
        self.redis_url
            .as_ref()
            .map(|url| Arc::new(RedisStore::new(url.clone())) as Arc<dyn RedisResource>)
    }
}
