//! Secret references in configuration (`env://NAME`, `file://path`) and their providers.

mod error;
mod provider;
mod r#ref;
mod resolve;
mod value;

pub use error::SecretError;
pub use provider::{CompositeProvider, EnvSecretsProvider, FileSecretsProvider, SecretsProvider};
pub use r#ref::{SecretRef, SecretRefParseError};
pub use resolve::{resolve_config, resolve_setting};
pub use value::SecretValue;
