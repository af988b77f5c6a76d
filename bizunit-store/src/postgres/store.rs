use sqlx::PgPool;

use crate::store::{NewPlan, PlanRecord, PlanStore, PlanSummary, StoreError};

use super::plans;

pub struct PostgresPlanStore {
    pool: PgPool,
}

impl PostgresPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl PlanStore for PostgresPlanStore {
    async fn upsert_plan(&self, plan: NewPlan) -> Result<PlanRecord, StoreError> {
        plans::upsert_plan(&self.pool, plan).await
    }

    async fn get_plan(&self, name: &str) -> Result<Option<PlanRecord>, StoreError> {
        plans::get_plan(&self.pool, name).await
    }

    async fn list_plans(&self) -> Result<Vec<PlanSummary>, StoreError> {
        plans::list_plans(&self.pool).await
    }
}
