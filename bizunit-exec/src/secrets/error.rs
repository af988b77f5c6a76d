use super::{SecretRef, SecretRefParseError};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(SecretRef),
    #[error("secret provider error for {secret_ref}: {message}")]
    Provider {
        secret_ref: SecretRef,
        message: String,
    },
    #[error("secret value is not valid UTF-8")]
    NotUtf8,
    #[error(transparent)]
    InvalidRef(#[from] SecretRefParseError),
}

impl SecretError {
    pub fn provider(secret_ref: SecretRef, message: impl Into<String>) -> Self {
        Self::Provider {
            secret_ref,
            message: message.into(),
        }
    }
}
