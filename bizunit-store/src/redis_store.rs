use async_trait::async_trait;
use bizunit_core::services::{RedisResource, ResourceError};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Mutex;

/// Redis handle for one plan execution, connected on first use.
pub struct RedisStore {
    url: String,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStore {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection: Mutex::new(None),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    async fn connection(&self) -> Result<MultiplexedConnection, ResourceError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let client = redis::Client::open(self.url.as_str()).map_err(connect)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connect)?;
        tracing::debug!("redis connected");
        *guard = Some(conn.clone());
        Ok(conn)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl RedisResource for RedisStore {
    async fn get_data(&self, key: &str) -> Result<Option<String>, ResourceError> {
        let mut conn = self.connection().await?;
        conn.get(key).await.map_err(driver)
    }

    async fn set_data_with_expire(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ResourceError> {
        let mut conn = self.connection().await?;
        if ttl_secs == 0 {
            conn.set::<_, _, ()>(key, value).await.map_err(driver)
        } else {
            conn.set_ex::<_, _, ()>(key, value, ttl_secs).await.map_err(driver)
        }
    }

    async fn exist(&self, key: &str) -> Result<bool, ResourceError> {
        let mut conn = self.connection().await?;
        conn.exists(key).await.map_err(driver)
    }

    async fn del(&self, key: &str) -> Result<u64, ResourceError> {
        let mut conn = self.connection().await?;
        conn.del(key).await.map_err(driver)
    }

    async fn close(&self) {
        if self.connection.lock().await.take().is_some() {
            tracing::debug!("redis closed");
        }
    }
}

fn connect(e: redis::RedisError) -> ResourceError {
    ResourceError::Connect(e.to_string())
}

fn driver(e: redis::RedisError) -> ResourceError {
    ResourceError::Driver(e.to_string())
}
