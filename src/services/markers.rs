// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GeoJSON export of spots for the map's marker source.

use crate::models::Spot;
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

/// One point feature per spot. Spots with invalid coordinates are skipped.
pub fn to_feature_collection(spots: &[Spot]) -> FeatureCollection {
    let features = spots
        .iter()
        .filter(|spot| spot.has_valid_coordinates())
        .map(to_feature)
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn to_feature(spot: &Spot) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(spot.id));
    properties.insert("origin".to_string(), json!(spot.origin.as_str()));
    properties.insert("type_label".to_string(), json!(spot.type_label));
    properties.insert("status".to_string(), json!(spot.status.as_str()));
    properties.insert("address".to_string(), json!(spot.title()));
    properties.insert("snippet".to_string(), json!(snippet(spot)));

    Feature {
        bbox: None,
        // GeoJSON positions are [lng, lat]
        geometry: Some(Geometry::new(Value::Point(vec![spot.lng, spot.lat]))),
        id: Some(Id::String(spot.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Marker subtitle, e.g. "Outdoor Water Fountain • active • verified".
pub fn snippet(spot: &Spot) -> String {
    format!(
        "{} • {} • {}",
        spot.display_type_label(),
        spot.status.as_str(),
        spot.origin.as_str()
    )
}
