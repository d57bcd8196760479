// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Water spot model as stored in the `sources` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Provenance of a spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Curated seed data
    Verified,
    /// Submitted by a signed-in user
    Community,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Verified => "verified",
            Origin::Community => "community",
        }
    }
}

/// Whether the water source currently works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    #[default]
    Active,
    Inactive,
}

impl SpotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpotStatus::Active => "active",
            SpotStatus::Inactive => "inactive",
        }
    }
}

/// Type labels the contribution form offers.
pub mod type_labels {
    pub const OUTDOOR_WATER_FOUNTAIN: &str = "outdoor_water_fountain";
    pub const INDOOR_WATER_FOUNTAIN: &str = "indoor_water_fountain";
}

/// A water spot row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    /// Server-assigned, stable across fetches
    pub id: String,
    pub origin: Origin,
    /// Identifier in the upstream dataset (verified spots only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub type_label: String,
    pub lat: f64,
    pub lng: f64,
    pub status: SpotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheelchair_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dog_bowl: Option<bool>,
    /// Object path in the images bucket (or, for old rows, a full URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Spot {
    pub fn has_valid_coordinates(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Resolve the stored image reference to a public URL.
    pub fn public_image_url(&self, base_url: &str, bucket: &str) -> Option<String> {
        public_image_url(self.image_path.as_deref(), base_url, bucket)
    }

    /// Human-readable type label.
    pub fn display_type_label(&self) -> String {
        display_type_label(&self.type_label)
    }

    /// Marker title, falling back to a generic name when no address is known.
    pub fn title(&self) -> &str {
        self.address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or("Water spot")
    }
}

/// Resolve an image reference to a public storage URL.
///
/// Accepts full URLs, already-public paths, plain object paths and object
/// paths that were stored with the bucket name in front.
pub fn public_image_url(image_path: Option<&str>, base_url: &str, bucket: &str) -> Option<String> {
    let raw = image_path?.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }

    let base = base_url.trim_end_matches('/');

    if raw.contains("/storage/v1/object/public/") {
        return Some(if raw.starts_with('/') {
            format!("{}{}", base, raw)
        } else {
            raw.to_string()
        });
    }

    let mut path = raw.trim_start_matches('/');
    if let Some(stripped) = path.strip_prefix(bucket).and_then(|p| p.strip_prefix('/')) {
        path = stripped;
    }

    let encoded: Vec<String> = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();

    Some(format!(
        "{}/storage/v1/object/public/{}/{}",
        base,
        bucket,
        encoded.join("/")
    ))
}

/// Turn `outdoor_water_fountain` into "Outdoor Water Fountain".
pub fn display_type_label(type_label: &str) -> String {
    match type_label {
        type_labels::OUTDOOR_WATER_FOUNTAIN => "Outdoor Water Fountain".to_string(),
        type_labels::INDOOR_WATER_FOUNTAIN => "Indoor Water Fountain".to_string(),
        other => other
            .replace('_', " ")
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" "),
    }
}

/// Fields a user fills in when contributing a spot.
#[derive(Debug, Clone, Validate)]
pub struct NewContribution {
    #[validate(length(min = 1, max = 500, message = "address must not be empty"))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[validate(length(min = 1, max = 64))]
    pub type_label: String,
    pub status: SpotStatus,
    pub wheelchair_access: bool,
    pub dog_bowl: bool,
}

impl NewContribution {
    pub fn new(address: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            address: address.into().trim().to_string(),
            lat,
            lng,
            type_label: type_labels::OUTDOOR_WATER_FOUNTAIN.to_string(),
            status: SpotStatus::Active,
            wheelchair_access: false,
            dog_bowl: false,
        }
    }
}

/// Row body for inserting a community spot.
///
/// Amenity flags that are off are sent as null, never `false`.
#[derive(Debug, Serialize)]
pub(crate) struct SourceInsert<'a> {
    pub origin: Origin,
    pub type_label: &'a str,
    pub lat: f64,
    pub lng: f64,
    pub status: SpotStatus,
    pub wheelchair_access: Option<bool>,
    pub dog_bowl: Option<bool>,
    pub image_path: Option<&'a str>,
    pub address: &'a str,
    pub created_by: Option<&'a str>,
}

impl<'a> SourceInsert<'a> {
    pub fn community(
        fields: &'a NewContribution,
        image_path: Option<&'a str>,
        created_by: Option<&'a str>,
    ) -> Self {
        Self {
            origin: Origin::Community,
            type_label: &fields.type_label,
            lat: fields.lat,
            lng: fields.lng,
            status: fields.status,
            wheelchair_access: fields.wheelchair_access.then_some(true),
            dog_bowl: fields.dog_bowl.then_some(true),
            image_path,
            address: &fields.address,
            created_by,
        }
    }
}

/// Photo attached to a contribution.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// File extension for the object name.
    pub fn extension(&self) -> &'static str {
        match self.content_type.to_ascii_lowercase().as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}
