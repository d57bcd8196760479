// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Flowie command-line client
//!
//! Loads the backend configuration, restores any saved session and prints
//! the water spots and current weather for the default city view.

use flowie_core::{
    config::Config,
    models::BoundingBox,
    services::{apply_filters, markers, CameraPosition, SpotFilterState},
    AppContext,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initial camera region (Vienna).
const DEFAULT_REGION: (f64, f64, f64, f64) = (48.1304464434, 16.2778988626, 48.338028, 16.5347851295);
const DEFAULT_ZOOM: f64 = 14.0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(backend = %config.supabase_url, "Starting Flowie");

    let ctx = AppContext::init(config).await?;

    let (min_lat, min_lng, max_lat, max_lng) = DEFAULT_REGION;
    let visible = BoundingBox::new(min_lat, min_lng, max_lat, max_lng)?;
    let camera = CameraPosition {
        visible,
        zoom: DEFAULT_ZOOM,
    };

    let (lat, lon) = visible.center();
    let weather = ctx.weather.load_weather(lat, lon).await;
    println!(
        "Weather: {} {} {}",
        weather.icon,
        weather.temperature,
        weather.wind.as_deref().unwrap_or("")
    );

    if let Err(e) = ctx.viewport.refresh_now(camera).await {
        tracing::error!(error = %e, "Initial spot load failed");
    }
    let snapshot = ctx.viewport.snapshot();
    let filters = SpotFilterState {
        search_text: std::env::args().nth(1).unwrap_or_default(),
        ..Default::default()
    };
    let visible_spots = apply_filters(&snapshot.spots, &filters);

    for spot in &visible_spots {
        println!(
            "{:>10.5} {:>10.5}  {}  ({})",
            spot.lat,
            spot.lng,
            spot.title(),
            markers::snippet(spot)
        );
    }
    tracing::info!(
        loaded = snapshot.spots.len(),
        shown = visible_spots.len(),
        saved = ctx.saved.saved_ids().await.len(),
        "Spots loaded"
    );

    ctx.shutdown();
    Ok(())
}

/// Initialize logging. JSON lines when `LOG_FORMAT=json`, human-readable otherwise.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("flowie_core=debug,info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
