use async_trait::async_trait;

use crate::store::types::*;

/// Named, versioned plan templates.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Insert or replace the plan stored under `plan.name`. Republishing an identical document
    /// leaves the version unchanged.
    async fn upsert_plan(&self, plan: NewPlan) -> Result<PlanRecord, StoreError>;

    async fn get_plan(&self, name: &str) -> Result<Option<PlanRecord>, StoreError>;

    /// Most recently updated first.
    async fn list_plans(&self) -> Result<Vec<PlanSummary>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Other(String),
    #[error("stored plan is malformed: {0}")]
    Document(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Other(e.to_string())
    }
}
