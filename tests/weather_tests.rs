// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weather poller against the fake forecast endpoint.

mod common;

use common::TestServer;
use flowie_core::models::WeatherSnapshot;
use flowie_core::services::WeatherPoller;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn test_light_rain_snapshot() {
    let server = TestServer::start().await;
    server.backend.weather_code.store(61, Ordering::SeqCst);
    let poller = WeatherPoller::new(server.weather_client());

    let snapshot = poller.load_weather(48.2, 16.37).await;
    assert_eq!(
        snapshot,
        WeatherSnapshot {
            temperature: "21°C".to_string(),
            icon: "🌧️".to_string(),
            wind: Some("3.4 m/s".to_string()),
        }
    );
    assert_eq!(poller.snapshot(), snapshot);

    let request = &server.backend.requests_to("/v1/forecast")[0];
    let pairs = request.query_pairs();
    assert!(pairs.contains(&("latitude".to_string(), "48.2".to_string())));
    assert!(pairs.contains(&("longitude".to_string(), "16.37".to_string())));
    assert!(pairs.contains(&("current_weather".to_string(), "true".to_string())));
}

#[tokio::test]
async fn test_unknown_code_uses_question_mark() {
    let server = TestServer::start().await;
    server.backend.weather_code.store(999, Ordering::SeqCst);
    let poller = WeatherPoller::new(server.weather_client());

    assert_eq!(poller.load_weather(48.2, 16.37).await.icon, "❓");
}

#[tokio::test]
async fn test_failure_overwrites_previous_reading() {
    let server = TestServer::start().await;
    let poller = WeatherPoller::new(server.weather_client());
    assert_eq!(poller.snapshot(), WeatherSnapshot::default());

    assert!(!poller.load_weather(48.2, 16.37).await.is_unavailable());

    server.backend.weather_status.store(502, Ordering::SeqCst);
    let snapshot = poller.load_weather(48.2, 16.37).await;
    assert_eq!(snapshot, WeatherSnapshot::unavailable());
    assert_eq!(snapshot.temperature, "N/A");
    assert_eq!(snapshot.icon, "❌");
    assert_eq!(snapshot.wind, None);
    assert!(poller.snapshot().is_unavailable());
}

#[tokio::test]
async fn test_polling_repeats_until_handle_dropped() {
    let server = TestServer::start().await;
    let poller = WeatherPoller::new(server.weather_client());
    let mut rx = poller.subscribe();

    let handle = poller.spawn_polling(48.2, 16.37, Duration::from_millis(50));
    assert!(handle.is_running());
    for _ in 0..3 {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("poll tick")
            .unwrap();
    }
    handle.stop();

    // Let an in-flight poll settle, then nothing more arrives
    tokio::time::sleep(Duration::from_millis(100)).await;
    let seen = server.backend.requests_to("/v1/forecast").len();
    assert!(seen >= 3);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.backend.requests_to("/v1/forecast").len(), seen);
}
