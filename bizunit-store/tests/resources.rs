use bizunit_core::config::ResourcesConfig;
use bizunit_core::services::{ResourceError, ResourceProvider};
use bizunit_store::PostgresResources;

#[test]
fn unconfigured_resources_hand_out_nothing() {
    let resources = PostgresResources::from_config(&ResourcesConfig::default());
    assert!(resources.is_empty());
    assert!(resources.rdb().is_none());
    assert!(resources.redis().is_none());
}

#[tokio::test]
async fn each_execution_gets_fresh_unconnected_handles() {
    let resources = PostgresResources::new(
        Some("postgres://app@127.0.0.1:1/orders".into()),
        Some("redis://127.0.0.1:1".into()),
    );
    assert!(!resources.is_empty());
    let first = resources.rdb().expect("rdb handle");
    let second = resources.rdb().expect("rdb handle");
    assert!(!std::sync::Arc::ptr_eq(&first, &second));

    // Closing a handle that never connected is a no-op.
    first.close().await;
    let redis = resources.redis().expect("redis handle");
    redis.close().await;
}

#[tokio::test]
async fn unreachable_servers_surface_as_connect_errors() {
    let resources = PostgresResources::new(None, Some("redis://127.0.0.1:1".into()));
    let redis = resources.redis().expect("redis handle");
    let err = redis.exist("session").await.unwrap_err();
    assert!(matches!(err, ResourceError::Connect(_)), "{err}");
}
