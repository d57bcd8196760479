// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local development.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default storage bucket holding community spot photos.
pub const DEFAULT_STORAGE_BUCKET: &str = "spots-images";
/// Default Open-Meteo endpoint.
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.open-meteo.com";
/// Custom URI scheme target for magic-link callbacks.
pub const DEFAULT_AUTH_REDIRECT_URL: &str = "flowie://login";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted backend project URL (e.g. `https://xyz.supabase.co`)
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request
    pub supabase_anon_key: String,
    /// Object storage bucket for spot images
    pub storage_bucket: String,
    /// Weather API base URL
    pub weather_api_url: String,
    /// Magic-link redirect target
    pub auth_redirect_url: String,
    /// Directory for locally persisted preferences
    pub data_dir: PathBuf,
    /// How often the weather card refreshes
    pub weather_poll_interval: Duration,
    /// Quiet period before a settled camera triggers a spot fetch
    pub viewport_debounce: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            weather_api_url: DEFAULT_WEATHER_API_URL.to_string(),
            auth_redirect_url: DEFAULT_AUTH_REDIRECT_URL.to_string(),
            data_dir: PathBuf::from(".flowie"),
            weather_poll_interval: Duration::from_secs(30),
            viewport_debounce: Duration::from_millis(350),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let supabase_url = env::var("SUPABASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?;
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "SUPABASE_URL",
                value: supabase_url,
            });
        }

        Ok(Self {
            supabase_url,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| DEFAULT_STORAGE_BUCKET.to_string()),
            weather_api_url: env::var("WEATHER_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_WEATHER_API_URL.to_string()),
            auth_redirect_url: env::var("AUTH_REDIRECT_URL")
                .unwrap_or_else(|_| DEFAULT_AUTH_REDIRECT_URL.to_string()),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".flowie")),
            weather_poll_interval: Duration::from_secs(
                env::var("WEATHER_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(30),
            ),
            viewport_debounce: Duration::from_millis(
                env::var("VIEWPORT_DEBOUNCE_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(350),
            ),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
