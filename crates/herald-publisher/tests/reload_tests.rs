// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazy route binding against stored routes.

use std::sync::Arc;

use bytes::Bytes;
use herald_config::model::{PublisherConfig, StorageConfig};
use herald_core::{EntityStore, HeraldError, NotificationType, Route, RouteMode, TenantScope};
use herald_publisher::{MemoryBroker, PublisherFactory, PublisherRegistry};
use herald_storage::SqliteStore;

async fn store(dir: &tempfile::TempDir) -> SqliteStore {
    SqliteStore::open(StorageConfig {
        database_path: dir.path().join("p.db").to_str().unwrap().to_string(),
        migrate_only: false,
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn first_publish_binds_stored_route() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let scope = TenantScope::new("t1", "p1", "a1");
    let route = Route::new(&scope, "sms", NotificationType::Short, RouteMode::Tx, "mem://sms-bulk");
    store.save_route(&scope, &route).await.unwrap();

    let broker = Arc::new(MemoryBroker::new(8));
    let mut rx = broker.subscribe("sms-bulk");
    let registry = PublisherRegistry::new(PublisherFactory::standard(
        broker.clone(),
        &PublisherConfig::default(),
    ));
    assert!(!registry.is_bound(&route.id));

    registry
        .publish_with_reload(&store, &scope, &route.id, Bytes::from_static(b"payload"))
        .await
        .unwrap();
    assert!(registry.is_bound(&route.id));
    assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"payload"));
}

#[tokio::test]
async fn missing_route_fails_after_one_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let scope = TenantScope::new("t1", "p1", "a1");
    let registry = PublisherRegistry::new(PublisherFactory::standard(
        Arc::new(MemoryBroker::new(8)),
        &PublisherConfig::default(),
    ));

    let err = registry
        .publish_with_reload(&store, &scope, "no-such-route", Bytes::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HeraldError::NoRoute(_)));

    let err = registry
        .publish_with_reload(&store, &scope, "", Bytes::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HeraldError::UnknownRoute(_)));
}

#[tokio::test]
async fn routes_of_other_tenants_are_not_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let owner = TenantScope::new("t1", "p1", "a1");
    let route = Route::new(&owner, "sms", NotificationType::Short, RouteMode::Tx, "mem://sms");
    store.save_route(&owner, &route).await.unwrap();

    let registry = PublisherRegistry::new(PublisherFactory::standard(
        Arc::new(MemoryBroker::new(8)),
        &PublisherConfig::default(),
    ));
    let other = TenantScope::new("t2", "p1", "a1");
    let err = registry
        .publish_with_reload(&store, &other, &route.id, Bytes::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HeraldError::NoRoute(_)));
}
