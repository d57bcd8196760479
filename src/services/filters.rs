// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side narrowing of the spots currently loaded on the map.

use crate::models::{Origin, Spot};
use serde::{Deserialize, Serialize};

/// Filter toggles and search text from the map's filter panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotFilterState {
    pub search_text: String,
    pub verified: bool,
    pub community: bool,
    pub wheelchair: bool,
    pub dog_bowl: bool,
}

impl SpotFilterState {
    /// True if any filter narrows the set.
    pub fn is_active(&self) -> bool {
        !self.search_text.trim().is_empty()
            || self.verified != self.community
            || self.wheelchair
            || self.dog_bowl
    }
}

/// Apply all filters. Pure; input order is preserved.
pub fn apply_filters(spots: &[Spot], filters: &SpotFilterState) -> Vec<Spot> {
    let query = filters.search_text.trim().to_lowercase();

    spots
        .iter()
        .filter(|spot| matches_search(spot, &query))
        .filter(|spot| matches_origin(spot, filters))
        .filter(|spot| !filters.wheelchair || spot.wheelchair_access == Some(true))
        .filter(|spot| !filters.dog_bowl || spot.dog_bowl == Some(true))
        .cloned()
        .collect()
}

fn matches_search(spot: &Spot, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {}",
        spot.address.as_deref().unwrap_or(""),
        spot.type_label
    )
    .to_lowercase();
    haystack.contains(query)
}

// Both toggles off and both on mean the same thing: no origin restriction.
fn matches_origin(spot: &Spot, filters: &SpotFilterState) -> bool {
    if filters.verified == filters.community {
        return true;
    }
    match spot.origin {
        Origin::Verified => filters.verified,
        Origin::Community => filters.community,
    }
}
