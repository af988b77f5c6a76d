#![forbid(unsafe_code)]

//! Storage for Bizunit: per-execution Postgres and Redis resources, and the published plan
//! templates.

pub mod store;
pub mod postgres;
pub mod redis_store;
pub mod resources;

pub use crate::store::{NewPlan, PlanRecord, PlanStore, PlanSummary, StoreError};
pub use crate::postgres::{run_migrations, PostgresPlanStore, PostgresRdb};
pub use crate::redis_store::RedisStore;
pub use crate::resources::PostgresResources;
