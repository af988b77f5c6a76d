use async_trait::async_trait;
use bizunit_core::services::{RdbResource, ResourceError};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tokio::sync::Mutex;

/// Postgres handle for one plan execution. Nothing connects until the first statement, and
/// `close` drops the connection so a later statement reconnects.
pub struct PostgresRdb {
    url: String,
    pool: Mutex<Option<PgPool>>,
}

impl PostgresRdb {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool: Mutex::new(None),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.pool.lock().await.is_some()
    }

    async fn pool(&self) -> Result<PgPool, ResourceError> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.url)
            .await
            .map_err(|e| ResourceError::Connect(e.to_string()))?;
        tracing::debug!("rdb connected");
        *guard = Some(pool.clone());
        Ok(pool)
    }
}

impl std::fmt::Debug for PostgresRdb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRdb").finish_non_exhaustive()
    }
}

#[async_trait]
impl RdbResource for PostgresRdb {
    async fn query(&self, sql: &str, params: &[JsonValue]) -> Result<Vec<JsonValue>, ResourceError> {
        let pool = self.pool().await?;
        let wrapped = wrap_rows(sql);
        let row = bind_params(sqlx::query(&wrapped), params)
            .fetch_one(&pool)
            .await
            .map_err(driver)?;
        let rows: JsonValue = row.try_get(0).map_err(driver)?;
        match rows {
            JsonValue::Array(rows) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    async fn execute(&self, sql: &str, params: &[JsonValue]) -> Result<u64, ResourceError> {
        let pool = self.pool().await?;
        let done = bind_params(sqlx::query(sql), params)
            .execute(&pool)
            .await
            .map_err(driver)?;
        Ok(done.rows_affected())
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
            tracing::debug!("rdb closed");
        }
    }
}

/// Aggregate the statement's rows into one JSON array; `json` keeps column order.
fn wrap_rows(sql: &str) -> String {
    let inner = sql.trim().trim_end_matches(';');
    format!("SELECT COALESCE(json_agg(bizunit_rows), '[]'::json) FROM ({inner}) AS bizunit_rows")
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [JsonValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            JsonValue::Null => query.bind(None::<String>),
            JsonValue::Bool(b) => query.bind(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            JsonValue::String(s) => query.bind(s.as_str()),
            other => query.bind(sqlx::types::Json(other)),
        };
    }
    query
}

fn driver(e: sqlx::Error) -> ResourceError {
    match e {
        sqlx::Error::Database(db) => ResourceError::Driver(db.message().to_string()),
        other => ResourceError::Driver(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_aggregated_as_json() {
        assert_eq!(
            wrap_rows("select id from t where a = $1;\n"),
            "SELECT COALESCE(json_agg(bizunit_rows), '[]'::json) FROM (select id from t where a = $1) AS bizunit_rows"
        );
    }

    #[tokio::test]
    async fn nothing_connects_until_used() {
        let rdb = PostgresRdb::new("postgres://nobody@127.0.0.1:1/none");
        assert!(!rdb.is_connected().await);
        rdb.close().await;
        assert!(!rdb.is_connected().await);
    }
}
