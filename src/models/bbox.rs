// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Axis-aligned lat/lng bounding box used to scope spatial queries.

use geo::{coord, Intersects, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive lat/lng rectangle. Always satisfies `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Build a box, rejecting inverted or out-of-range edges.
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Result<Self, BboxError> {
        let all = [min_lat, min_lng, max_lat, max_lng];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(BboxError::NotFinite);
        }
        if min_lat > max_lat || min_lng > max_lng {
            return Err(BboxError::Inverted);
        }
        if min_lat < -90.0 || max_lat > 90.0 || min_lng < -180.0 || max_lng > 180.0 {
            return Err(BboxError::OutOfRange);
        }
        Ok(Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        })
    }

    /// Smallest box enclosing a set of `(lat, lng)` points, e.g. the four
    /// corners of the map's visible region. Corners are clamped to valid
    /// ranges since a tilted or wrapped camera can report slightly outside them.
    pub fn from_points(points: &[(f64, f64)]) -> Result<Self, BboxError> {
        let (first, rest) = points.split_first().ok_or(BboxError::Empty)?;
        let mut b = (first.0, first.1, first.0, first.1);
        for &(lat, lng) in rest {
            b.0 = b.0.min(lat);
            b.1 = b.1.min(lng);
            b.2 = b.2.max(lat);
            b.3 = b.3.max(lng);
        }
        Self::new(
            b.0.max(-90.0),
            b.1.max(-180.0),
            b.2.min(90.0),
            b.3.min(180.0),
        )
    }

    /// Inclusive containment check.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        // `Intersects` includes the boundary, unlike `Contains`.
        self.as_rect().intersects(&Point::new(lng, lat))
    }

    /// Largest per-edge absolute difference to another box, in degrees.
    pub fn max_edge_delta(&self, other: &BoundingBox) -> f64 {
        [
            (self.min_lat - other.min_lat).abs(),
            (self.min_lng - other.min_lng).abs(),
            (self.max_lat - other.max_lat).abs(),
            (self.max_lng - other.max_lng).abs(),
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }

    pub fn center(&self) -> (f64, f64) {
        let c = self.as_rect().center();
        (c.y, c.x)
    }

    /// The box as a `geo` rectangle (x = lng, y = lat).
    pub fn as_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_lng, y: self.min_lat },
            coord! { x: self.max_lng, y: self.max_lat },
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.5},{:.5} .. {:.5},{:.5}]",
            self.min_lat, self.min_lng, self.max_lat, self.max_lng
        )
    }
}

/// Errors from bounding box construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BboxError {
    #[error("bounding box min edge exceeds max edge")]
    Inverted,

    #[error("bounding box outside valid lat/lng range")]
    OutOfRange,

    #[error("bounding box coordinate is not finite")]
    NotFinite,

    #[error("cannot build a bounding box from no points")]
    Empty,
}

impl From<BboxError> for crate::error::AppError {
    fn from(e: BboxError) -> Self {
        crate::error::AppError::BadRequest(e.to_string())
    }
}
