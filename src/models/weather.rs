// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weather card state and Open-Meteo response shapes.

use serde::{Deserialize, Serialize};

/// Glyph shown for weather codes without a mapping.
pub const UNKNOWN_ICON: &str = "❓";

/// What the weather card displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherSnapshot {
    /// Display string, e.g. "21°C"
    pub temperature: String,
    pub icon: String,
    /// Display string, e.g. "3.4 m/s"
    pub wind: Option<String>,
}

impl Default for WeatherSnapshot {
    /// Placeholder shown before the first poll completes.
    fn default() -> Self {
        Self {
            temperature: "--°C".to_string(),
            icon: UNKNOWN_ICON.to_string(),
            wind: Some("-- m/s".to_string()),
        }
    }
}

impl WeatherSnapshot {
    /// Sentinel published when a poll fails.
    pub fn unavailable() -> Self {
        Self {
            temperature: "N/A".to_string(),
            icon: "❌".to_string(),
            wind: None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        *self == Self::unavailable()
    }

    pub fn from_current(current: &CurrentWeather) -> Self {
        Self {
            temperature: format!("{}°C", current.temperature.trunc() as i64),
            icon: weather_code_to_icon(current.weathercode).to_string(),
            wind: Some(format!("{} m/s", current.windspeed)),
        }
    }
}

/// Map a WMO weather code to a display glyph.
pub fn weather_code_to_icon(code: i32) -> &'static str {
    match code {
        0 => "☀️",
        1 | 2 => "🌤️",
        3 => "☁️",
        45 | 48 => "🌫️",
        51 | 53 | 55 => "🌦️",
        61 | 63 | 65 => "🌧️",
        71 | 73 | 75 => "❄️",
        95 => "⛈️",
        _ => UNKNOWN_ICON,
    }
}

/// Forecast endpoint response (only the fields we read).
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub current_weather: CurrentWeather,
}

/// Current conditions block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentWeather {
    /// Degrees Celsius
    pub temperature: f64,
    pub weathercode: i32,
    /// Metres per second as requested
    pub windspeed: f64,
}
