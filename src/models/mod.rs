// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod bbox;
pub mod session;
pub mod spot;
pub mod weather;

pub use bbox::{BboxError, BoundingBox};
pub use session::{Session, SessionState};
pub use spot::{ImageUpload, NewContribution, Origin, Spot, SpotStatus};
pub use weather::{WeatherSnapshot, UNKNOWN_ICON};
