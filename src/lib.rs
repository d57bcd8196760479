// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Flowie: find public drinking water spots nearby.
//!
//! This crate provides the client core: spot queries against the hosted
//! backend, the map viewport loader, saved spots, sign-in, weather and
//! step counting. Rendering is left to the embedding UI.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

use anyhow::Context;
use config::Config;
use error::Result;
use services::{
    AuthService, PollHandle, SpotGateway, SupabaseClient, ViewportController, WeatherClient,
    WeatherPoller,
};
use std::sync::{Arc, Mutex};
use store::{FileKeyValueStore, KeyValueStore, SavedSpotsStore};

/// Shared application context, built once at startup.
pub struct AppContext {
    pub config: Config,
    pub auth: AuthService,
    pub gateway: Arc<SpotGateway>,
    pub saved: SavedSpotsStore,
    pub weather: WeatherPoller,
    pub viewport: ViewportController,
    weather_poll: Mutex<Option<PollHandle>>,
}

impl AppContext {
    /// Wire up all services. Restores a persisted session and migrates
    /// legacy saved spots on the way.
    pub async fn init(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("flowie/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let kv: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(&config.data_dir));
        Self::with_store(config, http, kv).await
    }

    /// Like [`AppContext::init`] with a caller-supplied HTTP client and store.
    pub async fn with_store(
        config: Config,
        http: reqwest::Client,
        kv: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let client = SupabaseClient::from_config(http.clone(), &config);

        let auth = AuthService::new(client.clone(), &config.auth_redirect_url, kv.clone());
        auth.restore().await;

        let gateway = Arc::new(SpotGateway::new(
            client,
            auth.clone(),
            &config.storage_bucket,
        ));

        let saved = SavedSpotsStore::new(kv);
        if let Err(e) = saved.migrate_legacy(gateway.as_ref()).await {
            tracing::warn!(error = %e, "Legacy saved spots migration failed, will retry next launch");
        }

        let weather = WeatherPoller::new(WeatherClient::new(http, &config.weather_api_url));
        let viewport = ViewportController::new(gateway.clone(), config.viewport_debounce);

        tracing::info!(
            backend = %config.supabase_url,
            signed_in = auth.state().is_authenticated(),
            "Application context ready"
        );

        Ok(Self {
            config,
            auth,
            gateway,
            saved,
            weather,
            viewport,
            weather_poll: Mutex::new(None),
        })
    }

    /// Start (or move) weather polling at the configured interval.
    pub fn start_weather_polling(&self, lat: f64, lon: f64) {
        let handle = self
            .weather
            .spawn_polling(lat, lon, self.config.weather_poll_interval);
        // Replacing the handle drops, and so stops, any previous poll
        *self.weather_poll.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stop background work.
    pub fn shutdown(&self) {
        self.weather_poll
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.viewport.shutdown();
        tracing::info!("Application context shut down");
    }
}
