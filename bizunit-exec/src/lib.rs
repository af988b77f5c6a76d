#![forbid(unsafe_code)]

//! Execution side of Bizunit: protocol executors, the built-in block catalog and the plan
//! runner. Plan parsing, the block contract and the error taxonomy live in `bizunit-core`.

pub mod access;
pub mod blocks;
pub mod executor;
pub mod logging;
pub mod runner;
pub mod secrets;
pub mod xml;

pub use crate::access::StaticAccessController;
pub use crate::blocks::{default_factory, register_all};
pub use crate::executor::{HttpExecutor, ReqwestHttpClient, SoapExecutor};
pub use crate::logging::init_tracing;
pub use crate::runner::{PlanOutcome, PlanRun, PlanRunner};
