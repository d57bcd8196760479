// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spot queries and community contributions against the `sources` table.
//!
//! Every call is a fresh round trip; there is no caching layer here.

use crate::error::{AppError, AuthError, Result};
use crate::models::spot::SourceInsert;
use crate::models::{BoundingBox, ImageUpload, NewContribution, Spot};
use crate::services::auth::AuthService;
use crate::services::supabase::SupabaseClient;
use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use reqwest::Method;
use std::collections::HashSet;
use validator::Validate;

/// Table holding both verified and community spots.
pub const SOURCES_TABLE: &str = "sources";
/// Storage folder for contributed photos.
pub const COMMUNITY_IMAGE_PREFIX: &str = "community";
/// Row cap for a full-city bounding box query.
pub const DEFAULT_BBOX_LIMIT: u32 = 2000;
/// Row cap for the "my contributions" list.
pub const DEFAULT_MY_CONTRIBUTIONS_LIMIT: u32 = 200;

const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Read side of the gateway, as consumed by the map and the saved list.
#[async_trait]
pub trait SpotSource: Send + Sync {
    /// Spots inside the inclusive box, at most `max_rows`, unordered.
    async fn fetch_in_bbox(&self, bbox: &BoundingBox, max_rows: u32) -> Result<Vec<Spot>>;

    /// Point lookups for a set of ids. Unknown ids are skipped.
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Spot>>;
}

/// Remote spot gateway.
#[derive(Clone)]
pub struct SpotGateway {
    client: SupabaseClient,
    auth: AuthService,
    bucket: String,
}

impl SpotGateway {
    pub fn new(client: SupabaseClient, auth: AuthService, bucket: impl Into<String>) -> Self {
        Self {
            client,
            auth,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL for a spot's photo.
    pub fn image_url(&self, spot: &Spot) -> Option<String> {
        spot.public_image_url(self.client.base_url(), &self.bucket)
    }

    /// Single spot by id; `Ok(None)` if it doesn't exist.
    pub async fn fetch_by_id(&self, id: &str) -> Result<Option<Spot>> {
        let bearer = self.read_bearer().await;
        let request = self
            .client
            .rest(Method::GET, SOURCES_TABLE, bearer.as_deref())
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{}", id)),
                ("limit", "1".to_string()),
            ]);

        let rows: Vec<Spot> = self.client.send_json(request).await?;
        Ok(rows.into_iter().next())
    }

    /// Community spots created by `user_id`, newest first.
    pub async fn fetch_my_contributions(&self, user_id: &str, max_rows: u32) -> Result<Vec<Spot>> {
        if user_id.trim().is_empty() {
            return Err(AuthError::NotSignedIn.into());
        }

        let bearer = self.read_bearer().await;
        let request = self
            .client
            .rest(Method::GET, SOURCES_TABLE, bearer.as_deref())
            .query(&[
                ("select", "*".to_string()),
                ("origin", "eq.community".to_string()),
                ("created_by", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
                ("limit", max_rows.to_string()),
            ]);

        let spots: Vec<Spot> = self.client.send_json(request).await?;
        tracing::debug!(user_id, count = spots.len(), "Loaded my contributions");
        Ok(spots)
    }

    /// Insert a community spot, uploading its photo first if one is given.
    ///
    /// A failed upload aborts before the insert. A failed insert after a
    /// successful upload leaves the uploaded object behind.
    pub async fn create_contribution(
        &self,
        fields: NewContribution,
        image: Option<ImageUpload>,
    ) -> Result<Spot> {
        let fields = NewContribution {
            address: fields.address.trim().to_string(),
            ..fields
        };
        fields.validate()?;

        // Anonymous inserts are left to the table's row-level policy
        let token = self.auth.access_token().await?;
        let user_id = self.auth.current_user_id();

        let image_path = match image {
            Some(image) => Some(self.upload_image(token.as_deref(), image).await?),
            None => None,
        };

        let row = SourceInsert::community(&fields, image_path.as_deref(), user_id.as_deref());
        let request = self
            .client
            .rest(Method::POST, SOURCES_TABLE, token.as_deref())
            .header("Prefer", "return=representation")
            .json(&row);

        let inserted: Vec<Spot> = match self.client.send_json(request).await {
            Ok(rows) => rows,
            Err(e) => {
                if let Some(path) = &image_path {
                    tracing::warn!(image_path = %path, error = %e, "Insert failed after upload, image orphaned");
                }
                return Err(e);
            }
        };

        let spot = inserted.into_iter().next().ok_or_else(|| AppError::Server {
            status: 200,
            message: "insert returned no row".to_string(),
        })?;

        tracing::info!(spot_id = %spot.id, has_image = image_path.is_some(), "Community spot created");
        Ok(spot)
    }

    /// Upload under a fresh random name; never overwrites. Returns the object path.
    async fn upload_image(&self, token: Option<&str>, image: ImageUpload) -> Result<String> {
        if image.bytes.is_empty() {
            return Err(AppError::BadRequest("Image is empty".to_string()));
        }

        let path = format!(
            "{}/{}.{}",
            COMMUNITY_IMAGE_PREFIX,
            uuid::Uuid::new_v4(),
            image.extension()
        );
        let request = self
            .client
            .storage(
                Method::POST,
                &format!("object/{}/{}", self.bucket, path),
                token,
            )
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, image.content_type.as_str())
            .body(image.bytes);

        self.client.send_empty(request).await?;
        tracing::debug!(image_path = %path, "Spot image uploaded");
        Ok(path)
    }

    /// Session token if signed in. Reads fall back to the anon key rather than fail.
    async fn read_bearer(&self) -> Option<String> {
        match self.auth.access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "No usable session token, reading anonymously");
                None
            }
        }
    }
}

#[async_trait]
impl SpotSource for SpotGateway {
    async fn fetch_in_bbox(&self, bbox: &BoundingBox, max_rows: u32) -> Result<Vec<Spot>> {
        let bearer = self.read_bearer().await;
        let request = self
            .client
            .rest(Method::GET, SOURCES_TABLE, bearer.as_deref())
            .query(&[
                ("select", "*".to_string()),
                ("lat", format!("gte.{}", bbox.min_lat)),
                ("lat", format!("lte.{}", bbox.max_lat)),
                ("lng", format!("gte.{}", bbox.min_lng)),
                ("lng", format!("lte.{}", bbox.max_lng)),
                ("limit", max_rows.to_string()),
            ]);

        let mut spots: Vec<Spot> = self.client.send_json(request).await?;

        // Results must stay inside the requested box whatever the server sends
        let received = spots.len();
        spots.retain(|s| bbox.contains(s.lat, s.lng));
        spots.truncate(max_rows as usize);
        if spots.len() < received {
            tracing::warn!(
                dropped = received - spots.len(),
                "Dropped rows outside the requested box"
            );
        }

        tracing::debug!(bbox = %bbox, count = spots.len(), "Fetched spots in bbox");
        Ok(spots)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Spot>> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids.iter().filter(|id| seen.insert(*id)).cloned().collect();

        let found: Vec<Option<Spot>> = stream::iter(unique)
            .map(|id| async move { self.fetch_by_id(&id).await })
            .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
            .try_collect()
            .await?;

        Ok(found.into_iter().flatten().collect())
    }
}
