// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local persistence.

pub mod kv;
pub mod saved_spots;

pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use saved_spots::SavedSpotsStore;
