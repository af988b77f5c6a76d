use bizunit_core::services::HttpError;
use bizunit_core::{BlockError, BlockKey};

use crate::xml::XmlError;

/// Failures raised by the protocol executors. They do not know which block called them;
/// [`ExecutorError::into_block_error`] attaches that locator.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("endpoint is not a valid absolute URL: {0}")]
    InvalidEndpoint(String),
    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),
    #[error("invalid option `{name}`: {message}")]
    InvalidOption { name: String, message: String },
    #[error("cannot encode body: {0}")]
    Encode(String),
    #[error(transparent)]
    Transport(#[from] HttpError),
    #[error("malformed SOAP response: {0}")]
    Soap(#[from] XmlError),
}

impl ExecutorError {
    pub fn into_block_error(self, key: &BlockKey) -> BlockError {
        match self {
            ExecutorError::InvalidEndpoint(_) => key.invalid_argument("endpoint", self.to_string()),
            ExecutorError::InvalidMethod(_) => key.invalid_argument("method", self.to_string()),
            ExecutorError::InvalidOption { ref name, .. } => {
                let field = format!("options.{name}");
                key.invalid_argument(field, self.to_string())
            }
            ExecutorError::Encode(_) => key.invalid_argument("body", self.to_string()),
            ExecutorError::Transport(e) => key.transfer(e.to_string()),
            ExecutorError::Soap(e) => key.transfer(e.to_string()),
        }
    }
}
