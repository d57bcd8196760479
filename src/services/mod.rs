// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - backend access, session, polling and map logic.

pub mod auth;
pub mod filters;
pub mod markers;
pub mod spots;
pub mod steps;
pub mod supabase;
pub mod viewport;
pub mod weather;

pub use auth::AuthService;
pub use filters::{apply_filters, SpotFilterState};
pub use spots::{SpotGateway, SpotSource};
pub use steps::{StepCounter, StepCounterGuard, StepSensor, StepSink};
pub use supabase::SupabaseClient;
pub use viewport::{CameraPosition, ViewportController, ViewportPhase, ViewportSnapshot};
pub use weather::{PollHandle, WeatherClient, WeatherPoller};
