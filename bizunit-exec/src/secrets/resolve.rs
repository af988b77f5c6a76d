use bizunit_core::RuntimeConfig;

use super::{SecretError, SecretRef, SecretsProvider};

/// Resolve one configuration setting. Values that are not a reference to a scheme the
/// provider accepts are returned unchanged, so `postgres://...` stays a URL.
pub async fn resolve_setting(provider: &dyn SecretsProvider, raw: &str) -> Result<String, SecretError> {
    let Ok(secret_ref) = SecretRef::parse(raw) else {
        return Ok(raw.to_string());
    };
    if !provider.accepts(&secret_ref.scheme) {
        return Ok(raw.to_string());
    }
    let value = provider.get(&secret_ref).await?;
    let text = value.expose_str()?.to_string();
    tracing::debug!(secret = %secret_ref, "resolved secret setting");
    Ok(text)
}

/// Resolve every secret-bearing setting of `config` in place.
pub async fn resolve_config(provider: &dyn SecretsProvider, config: &mut RuntimeConfig) -> Result<(), SecretError> {
    if let Some(url) = &config.resources.rdb_url {
        config.resources.rdb_url = Some(resolve_setting(provider, url).await?);
    }
    if let Some(url) = &config.resources.redis_url {
        config.resources.redis_url = Some(resolve_setting(provider, url).await?);
    }
    for client in &mut config.access.clients {
        client.client_secret = resolve_setting(provider, &client.client_secret).await?;
    }
    Ok(())
}
