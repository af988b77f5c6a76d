#![forbid(unsafe_code)]

pub mod block;
pub mod config;
pub mod context;
pub mod error;
pub mod logger;
pub mod parser;
pub mod plan;
pub mod services;
pub mod storage;
pub mod template;
pub mod validate;
pub mod value;

pub use crate::block::{
    Block, BlockAggregator, BlockFactory, BlockFamily, BlockHeader, BlockNode, BlockResult, Flow,
    FromTemplate,
};
pub use crate::config::{AppEnv, ConfigError, RuntimeConfig};
pub use crate::context::{HeaderMap, PlanResponse, ProtocolContext, ProtocolExchange};
pub use crate::error::{BlockError, BlockKey, ErrorKind, ParseError, ValidationError, Violation};
pub use crate::logger::PlanLogger;
pub use crate::parser::{parse_plan_str, ParsedPlan, PlanFormat};
pub use crate::plan::{Plan, PlanDocument};
pub use crate::services::PlanServices;
pub use crate::storage::{AccountManager, BlockStorage, OriginRequest, PlanStorage, StackManager};
pub use crate::template::{
    BlockTemplate, ChildField, ChildOutline, ChildShape, ExtraManager, TemplateReader, TemplateWriter,
};
pub use crate::validate::validate_plan;
pub use crate::value::{FromValue, Handle, HandleObject, PathKey, Value, ValueMap};
