mod trait_store;
mod types;

pub use trait_store::{PlanStore, StoreError};
pub use types::{NewPlan, PlanRecord, PlanSummary};
