use bizunit_core::config::ClientConfig;
use bizunit_core::RuntimeConfig;
use bizunit_exec::secrets::{
    resolve_config, resolve_setting, CompositeProvider, EnvSecretsProvider, FileSecretsProvider,
    SecretError, SecretRef, SecretsProvider,
};

fn secret_ref(raw: &str) -> SecretRef {
    SecretRef::parse(raw).unwrap()
}

#[tokio::test]
async fn file_provider_reads_and_trims() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("db")).unwrap();
    std::fs::write(dir.path().join("db/password"), "hunter2\n").unwrap();

    let provider = FileSecretsProvider::new(dir.path());
    let value = provider.get(&secret_ref("file://db/password")).await.unwrap();
    assert_eq!(value.expose_str().unwrap(), "hunter2");
}

#[tokio::test]
async fn file_provider_stays_inside_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FileSecretsProvider::new(dir.path());
    for id in ["file://../etc/passwd", "file:///etc/passwd"] {
        let err = provider.get(&secret_ref(id)).await.unwrap_err();
        assert!(matches!(err, SecretError::Provider { .. }), "{id}: {err}");
    }

    let err = provider.get(&secret_ref("file://absent")).await.unwrap_err();
    assert!(matches!(err, SecretError::NotFound(_)));
}

#[tokio::test]
async fn env_provider_applies_its_prefix() {
    std::env::set_var("BIZUNIT_TEST_SECRET_SHOP", "from-env");
    let provider = EnvSecretsProvider {
        env_prefix: Some("BIZUNIT_TEST_SECRET_".into()),
        ..EnvSecretsProvider::default()
    };
    let value = provider.get(&secret_ref("env://SHOP")).await.unwrap();
    assert_eq!(value.expose_str().unwrap(), "from-env");

    let err = provider.get(&secret_ref("env://NOT_SET_ANYWHERE")).await.unwrap_err();
    assert!(matches!(err, SecretError::NotFound(_)));
}

#[tokio::test]
async fn composite_falls_through_missing_secrets() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    std::fs::write(second.path().join("token"), "second").unwrap();
    std::fs::write(second.path().join("shared"), "second-shared").unwrap();
    std::fs::write(first.path().join("shared"), "first-shared").unwrap();

    let provider = CompositeProvider::new(vec![
        Box::new(FileSecretsProvider::new(first.path())),
        Box::new(FileSecretsProvider::new(second.path())),
    ]);
    let token = provider.get(&secret_ref("file://token")).await.unwrap();
    assert_eq!(token.expose_str().unwrap(), "second");
    let shared = provider.get(&secret_ref("file://shared")).await.unwrap();
    assert_eq!(shared.expose_str().unwrap(), "first-shared");
    assert!(!provider.accepts("vault"));
}

#[tokio::test]
async fn plain_settings_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CompositeProvider::standard(dir.path());
    for raw in ["postgres://app@db/orders", "redis://cache:6379", "literal-secret"] {
        assert_eq!(resolve_setting(&provider, raw).await.unwrap(), raw);
    }
}

#[tokio::test]
async fn resolve_config_replaces_references() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("rdb"), "postgres://app:pw@db/orders\n").unwrap();
    std::fs::write(dir.path().join("shop"), "s3cret").unwrap();

    let mut config = RuntimeConfig::default();
    config.resources.rdb_url = Some("file://rdb".into());
    config.resources.redis_url = Some("redis://cache:6379".into());
    config.access.clients.push(ClientConfig {
        client_id: "shop".into(),
        client_secret: "file://shop".into(),
        redirect_uris: Vec::new(),
        scopes: Vec::new(),
    });

    let provider = CompositeProvider::standard(dir.path());
    resolve_config(&provider, &mut config).await.unwrap();
    assert_eq!(config.resources.rdb_url.as_deref(), Some("postgres://app:pw@db/orders"));
    assert_eq!(config.resources.redis_url.as_deref(), Some("redis://cache:6379"));
    assert_eq!(config.access.clients[0].client_secret, "s3cret");

    config.access.clients[0].client_secret = "file://gone".into();
    let err = resolve_config(&provider, &mut config).await.unwrap_err();
    assert!(matches!(err, SecretError::NotFound(_)));
}
