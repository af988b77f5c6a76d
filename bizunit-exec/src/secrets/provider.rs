use std::path::{Component, PathBuf};

use async_trait::async_trait;

use super::{SecretError, SecretRef, SecretValue};

#[async_trait]
pub trait SecretsProvider: Send + Sync {
    /// Whether references with this scheme are meant for this provider. Settings whose scheme
    /// no provider accepts are taken literally.
    fn accepts(&self, scheme: &str) -> bool;

    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError>;
}

/// Tries each provider in order; the first that has the secret wins.
#[derive(Default)]
pub struct CompositeProvider {
    providers: Vec<Box<dyn SecretsProvider>>,
}

impl CompositeProvider {
    pub fn new(providers: Vec<Box<dyn SecretsProvider>>) -> Self {
        Self { providers }
    }

    /// `env://NAME` from the process environment, `file://relative/path` under `base_dir`.
    pub fn standard(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            Box::new(EnvSecretsProvider::default()),
            Box::new(FileSecretsProvider::new(base_dir)),
        ])
    }
}

#[async_trait]
impl SecretsProvider for CompositeProvider {
    fn accepts(&self, scheme: &str) -> bool {
        self.providers.iter().any(|p| p.accepts(scheme))
    }

    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        for p in self.providers.iter().filter(|p| p.accepts(&secret_ref.scheme)) {
            match p.get(secret_ref).await {
                Ok(v) => return Ok(v),
                Err(SecretError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(SecretError::NotFound(secret_ref.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct EnvSecretsProvider {
    pub scheme: String,
    /// Prepended to the id before the variable lookup.
    pub env_prefix: Option<String>,
}

impl Default for EnvSecretsProvider {
    fn default() -> Self {
        Self {
            scheme: "env".to_string(),
            env_prefix: None,
        }
    }
}

#[async_trait]
impl SecretsProvider for EnvSecretsProvider {
    fn accepts(&self, scheme: &str) -> bool {
        self.scheme == scheme
    }

    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        let key = match &self.env_prefix {
            None => secret_ref.id.clone(),
            Some(p) => format!("{p}{}", secret_ref.id),
        };
        match std::env::var(&key) {
            Ok(v) => Ok(SecretValue::from_string(v)),
            Err(std::env::VarError::NotPresent) => Err(SecretError::NotFound(secret_ref.clone())),
            Err(e) => Err(SecretError::provider(secret_ref.clone(), e.to_string())),
        }
    }
}

/// Reads secrets from files under `base_dir`. Ids must be relative and stay inside it.
#[derive(Debug, Clone)]
pub struct FileSecretsProvider {
    pub scheme: String,
    pub base_dir: PathBuf,
}

impl FileSecretsProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            scheme: "file".to_string(),
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl SecretsProvider for FileSecretsProvider {
    fn accepts(&self, scheme: &str) -> bool {
        self.scheme == scheme
    }

    async fn get(&self, secret_ref: &SecretRef) -> Result<SecretValue, SecretError> {
        let relative = PathBuf::from(&secret_ref.id);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(SecretError::provider(
                secret_ref.clone(),
                "secret file id must be a relative path without `..`",
            ));
        }
        let path = self.base_dir.join(relative);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(SecretValue::from_bytes(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SecretError::NotFound(secret_ref.clone()))
            }
            Err(e) => Err(SecretError::provider(secret_ref.clone(), e.to_string())),
        }
    }
}
