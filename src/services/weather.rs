// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Current-weather polling for the map's weather card.

use crate::error::{AppError, Result};
use crate::models::weather::{CurrentWeather, ForecastResponse};
use crate::models::WeatherSnapshot;
use crate::services::supabase::check_response;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Open-Meteo forecast client.
#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Current conditions at a coordinate.
    pub async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentWeather> {
        let url = format!("{}/v1/forecast", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let response = check_response(response).await?;
        let forecast: ForecastResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Forecast parse error: {}", e)))?;
        Ok(forecast.current_weather)
    }
}

struct PollerInner {
    client: WeatherClient,
    state: watch::Sender<WeatherSnapshot>,
}

/// Holds the latest weather snapshot and refreshes it on demand or on a timer.
#[derive(Clone)]
pub struct WeatherPoller {
    inner: Arc<PollerInner>,
}

impl WeatherPoller {
    pub fn new(client: WeatherClient) -> Self {
        let (state, _) = watch::channel(WeatherSnapshot::default());
        Self {
            inner: Arc::new(PollerInner { client, state }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> WeatherSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Fetch once and publish the result. A failure publishes the
    /// unavailable sentinel in place of the previous reading.
    pub async fn load_weather(&self, lat: f64, lon: f64) -> WeatherSnapshot {
        let snapshot = match self.inner.client.current_weather(lat, lon).await {
            Ok(current) => {
                tracing::debug!(
                    temperature = current.temperature,
                    code = current.weathercode,
                    "Weather updated"
                );
                WeatherSnapshot::from_current(&current)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Weather fetch failed");
                WeatherSnapshot::unavailable()
            }
        };
        self.inner.state.send_replace(snapshot.clone());
        snapshot
    }

    /// Poll every `interval`, starting immediately. Stops when the handle is dropped.
    pub fn spawn_polling(&self, lat: f64, lon: f64, interval: Duration) -> PollHandle {
        let poller = self.clone();
        let interval = if interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                poller.load_weather(lat, lon).await;
            }
        });

        tracing::info!(lat, lon, interval_secs = interval.as_secs(), "Weather polling started");
        PollHandle { task }
    }
}

/// Running weather poll; aborted on drop.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop polling now rather than at end of scope.
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
