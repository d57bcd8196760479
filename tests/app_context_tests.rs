// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end wiring: context start-up, map load, filtering and markers.

mod common;

use common::{spot, TestServer};
use flowie_core::models::BoundingBox;
use flowie_core::services::{apply_filters, markers, CameraPosition, SpotFilterState, ViewportPhase};
use flowie_core::store::{KeyValueStore, MemoryKeyValueStore};
use flowie_core::AppContext;
use std::sync::Arc;

fn city_camera() -> CameraPosition {
    CameraPosition {
        visible: BoundingBox::new(48.1304464434, 16.2778988626, 48.338028, 16.5347851295).unwrap(),
        zoom: 12.0,
    }
}

#[tokio::test]
async fn test_init_migrates_legacy_saved_spots() {
    let server = TestServer::start().await;
    server.seed(vec![spot("a", 48.2, 16.37)]);

    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    kv.set("saved_spots", r#"["a"]"#).await.unwrap();

    let ctx = AppContext::with_store(server.config(), reqwest::Client::new(), kv)
        .await
        .unwrap();

    assert!(ctx.saved.is_saved("a").await);
    assert!(!ctx.auth.state().is_authenticated());
    ctx.shutdown();
}

#[tokio::test]
async fn test_map_load_filter_and_export() {
    let server = TestServer::start().await;
    let mut community = spot("c", 48.21, 16.36);
    community.origin = flowie_core::models::Origin::Community;
    community.dog_bowl = Some(true);
    server.seed(vec![spot("v", 48.2, 16.37), community, spot("far", 47.0, 15.4)]);

    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let ctx = AppContext::with_store(server.config(), reqwest::Client::new(), kv)
        .await
        .unwrap();

    ctx.viewport.refresh_now(city_camera()).await.unwrap();
    let snapshot = ctx.viewport.snapshot();
    assert_eq!(snapshot.phase, ViewportPhase::Idle);
    assert_eq!(snapshot.spots.len(), 2);
    assert_eq!(snapshot.bbox, Some(city_camera().visible));

    let limit = server.backend.requests_to("/rest/v1/sources")[0]
        .query_pairs()
        .into_iter()
        .find(|(k, _)| k == "limit")
        .map(|(_, v)| v);
    assert_eq!(limit.as_deref(), Some("1000"));

    let dog_friendly = apply_filters(
        &snapshot.spots,
        &SpotFilterState {
            dog_bowl: true,
            ..Default::default()
        },
    );
    assert_eq!(dog_friendly.len(), 1);

    let fc = markers::to_feature_collection(&dog_friendly);
    assert_eq!(fc.features.len(), 1);
    ctx.shutdown();
}

#[tokio::test]
async fn test_failed_load_surfaces_error_message() {
    let server = TestServer::start().await;
    server
        .backend
        .rest_status
        .store(500, std::sync::atomic::Ordering::SeqCst);

    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let ctx = AppContext::with_store(server.config(), reqwest::Client::new(), kv)
        .await
        .unwrap();

    assert!(ctx.viewport.refresh_now(city_camera()).await.is_err());
    let snapshot = ctx.viewport.snapshot();
    assert!(snapshot.spots.is_empty());
    assert!(snapshot.error.is_some());
}
