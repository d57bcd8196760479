// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Locally saved spots.
//!
//! Stored as one JSON object (spot id → last known spot snapshot) under a
//! single key. Snapshots are never re-synced with the server, so they may go
//! stale. Older installs stored a bare JSON array of ids. Those ids count as
//! saved but have no snapshot until [`SavedSpotsStore::migrate_legacy`]
//! resolves them; if the store is written first they move to a side key so
//! no id is lost.

use crate::error::{AppError, Result};
use crate::models::Spot;
use crate::services::spots::SpotSource;
use crate::store::kv::{keys, KeyValueStore};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Decoded contents of the saved-spots entry.
#[derive(Debug, Clone, PartialEq)]
enum SavedBlob {
    Snapshots(BTreeMap<String, Spot>),
    LegacyIds(Vec<String>),
}

/// Everything saved: resolved snapshots plus legacy ids still waiting for one.
#[derive(Debug, Default)]
struct Saved {
    snapshots: BTreeMap<String, Spot>,
    pending: BTreeSet<String>,
}

impl Saved {
    fn ids(&self) -> BTreeSet<String> {
        self.snapshots
            .keys()
            .chain(self.pending.iter())
            .cloned()
            .collect()
    }
}

/// Saved spot index over a key-value store.
#[derive(Clone)]
pub struct SavedSpotsStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SavedSpotsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// All saved spots that have a snapshot, keyed by id. Never fails:
    /// unreadable or corrupt storage reads as empty.
    pub async fn get_all(&self) -> BTreeMap<String, Spot> {
        self.load().await.snapshots
    }

    /// Ids of every saved spot, including unmigrated legacy ids.
    pub async fn saved_ids(&self) -> BTreeSet<String> {
        self.load().await.ids()
    }

    pub async fn is_saved(&self, id: &str) -> bool {
        let saved = self.load().await;
        saved.snapshots.contains_key(id) || saved.pending.contains(id)
    }

    /// Save the spot if absent, unsave it if present. Returns the resulting ids.
    pub async fn toggle(&self, spot: &Spot) -> Result<BTreeSet<String>> {
        let mut saved = self.load().await;
        if saved.snapshots.remove(&spot.id).is_some() || saved.pending.remove(&spot.id) {
            tracing::debug!(spot_id = %spot.id, "Spot unsaved");
        } else {
            saved.snapshots.insert(spot.id.clone(), spot.clone());
            tracing::debug!(spot_id = %spot.id, "Spot saved");
        }
        self.write(&saved).await?;
        Ok(saved.ids())
    }

    /// Unsave by id. Removing an id that is not saved is a no-op.
    pub async fn remove(&self, id: &str) -> Result<BTreeSet<String>> {
        let mut saved = self.load().await;
        let removed = saved.snapshots.remove(id).is_some();
        if saved.pending.remove(id) || removed {
            self.write(&saved).await?;
        }
        Ok(saved.ids())
    }

    /// Legacy ids that have no snapshot yet.
    pub async fn legacy_ids(&self) -> Vec<String> {
        self.load().await.pending.into_iter().collect()
    }

    /// Resolve legacy ids into snapshots by fetching each id.
    ///
    /// Ids that no longer resolve are dropped. On fetch failure the stored
    /// entries are left as they were so a later launch can retry. Returns the
    /// number of spots migrated.
    pub async fn migrate_legacy(&self, source: &dyn SpotSource) -> Result<usize> {
        let mut saved = self.load().await;
        if saved.pending.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = saved.pending.iter().cloned().collect();
        tracing::info!(count = ids.len(), "Migrating legacy saved spot ids");
        let spots = source.fetch_by_ids(&ids).await?;

        let migrated = spots.len();
        for spot in spots {
            saved.pending.remove(&spot.id);
            saved.snapshots.insert(spot.id.clone(), spot);
        }
        if !saved.pending.is_empty() {
            tracing::info!(
                dropped = saved.pending.len(),
                "Some legacy saved spots no longer exist"
            );
            saved.pending.clear();
        }
        self.write(&saved).await?;
        Ok(migrated)
    }

    async fn load(&self) -> Saved {
        let mut pending: BTreeSet<String> = self.load_side_ids().await.into_iter().collect();
        let blob = self.read_key(keys::SAVED_SPOTS).await.map(|raw| parse_blob(&raw));
        let snapshots = match blob {
            Some(SavedBlob::Snapshots(map)) => map,
            Some(SavedBlob::LegacyIds(ids)) => {
                pending.extend(ids);
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };
        pending.retain(|id| !snapshots.contains_key(id));
        Saved { snapshots, pending }
    }

    async fn load_side_ids(&self) -> Vec<String> {
        let blob = self.read_key(keys::LEGACY_SAVED_IDS).await.map(|raw| parse_blob(&raw));
        match blob {
            Some(SavedBlob::LegacyIds(ids)) => ids,
            _ => Vec::new(),
        }
    }

    async fn read_key(&self, key: &str) -> Option<String> {
        match self.kv.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Saved spots unreadable, treating as empty");
                None
            }
        }
    }

    /// Pending ids go to the side key before the main entry is replaced.
    async fn write(&self, saved: &Saved) -> Result<()> {
        if saved.pending.is_empty() {
            self.kv.remove(keys::LEGACY_SAVED_IDS).await?;
        } else {
            let text =
                serde_json::to_string(&saved.pending).map_err(|e| AppError::Internal(e.into()))?;
            self.kv.set(keys::LEGACY_SAVED_IDS, &text).await?;
        }
        let text =
            serde_json::to_string(&saved.snapshots).map_err(|e| AppError::Internal(e.into()))?;
        self.kv.set(keys::SAVED_SPOTS, &text).await
    }
}

fn parse_blob(raw: &str) -> SavedBlob {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Saved spots blob is corrupt, treating as empty");
            return SavedBlob::Snapshots(BTreeMap::new());
        }
    };

    match value {
        serde_json::Value::Object(entries) => {
            let mut map = BTreeMap::new();
            for (id, entry) in entries {
                match serde_json::from_value::<Spot>(entry) {
                    Ok(spot) => {
                        map.insert(id, spot);
                    }
                    Err(e) => {
                        tracing::warn!(spot_id = %id, error = %e, "Skipping unreadable saved spot");
                    }
                }
            }
            SavedBlob::Snapshots(map)
        }
        serde_json::Value::Array(items) => {
            let mut seen = BTreeSet::new();
            let ids = items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .filter(|id| seen.insert(id.clone()))
                .collect();
            SavedBlob::LegacyIds(ids)
        }
        _ => {
            tracing::warn!("Saved spots blob has unexpected shape, treating as empty");
            SavedBlob::Snapshots(BTreeMap::new())
        }
    }
}
