// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map viewport controller.
//!
//! Turns camera-settled events into bounding box fetches:
//! - tiny movements are ignored
//! - bursts of settles are debounced into one fetch
//! - only the latest request may publish its result
//!
//! Superseded fetches are not aborted on the wire; their results are dropped
//! when they arrive.

use crate::error::Result;
use crate::models::{BoundingBox, Spot};
use crate::services::spots::SpotSource;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Per-edge change (degrees) below which a settled camera counts as unmoved.
pub const MOVEMENT_THRESHOLD_DEG: f64 = 0.00005;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(350);

/// Row cap for a fetch at the given zoom level.
pub fn max_rows_for_zoom(zoom: f64) -> u32 {
    if zoom >= 14.0 {
        2000
    } else if zoom >= 12.0 {
        1000
    } else if zoom >= 10.0 {
        500
    } else {
        200
    }
}

/// Where the map camera came to rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPosition {
    pub visible: BoundingBox,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewportPhase {
    #[default]
    Idle,
    PendingDebounce,
    Fetching,
}

/// What the map should currently show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportSnapshot {
    pub phase: ViewportPhase,
    /// Spots from the last successful fetch
    pub spots: Vec<Spot>,
    /// Box those spots were fetched for
    pub bbox: Option<BoundingBox>,
    /// Message from the last failed fetch, cleared on the next success
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct LastRequest {
    bbox: BoundingBox,
    generation: u64,
    done: bool,
}

#[derive(Default)]
struct ControlState {
    next_generation: u64,
    /// Generation whose result is allowed to publish
    current: u64,
    last: Option<LastRequest>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    source: Arc<dyn SpotSource>,
    debounce: Duration,
    control: Mutex<ControlState>,
    state: watch::Sender<ViewportSnapshot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        // Nothing held under this lock can be left half-updated by a panic
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: ViewportPhase) {
        self.state.send_if_modified(|s| {
            let changed = s.phase != phase;
            s.phase = phase;
            changed
        });
    }
}

/// Debounced, latest-wins loader for the visible map region.
#[derive(Clone)]
pub struct ViewportController {
    inner: Arc<Inner>,
}

impl ViewportController {
    pub fn new(source: Arc<dyn SpotSource>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(ViewportSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                source,
                debounce,
                control: Mutex::new(ControlState::default()),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewportSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewportSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Handle a camera-settled event. Must be called inside a Tokio runtime.
    pub fn on_camera_settled(&self, camera: CameraPosition) {
        let mut control = self.inner.lock();
        control.tasks.retain(|t| !t.is_finished());

        if let Some(last) = control.last {
            if last.bbox.max_edge_delta(&camera.visible) < MOVEMENT_THRESHOLD_DEG {
                // Back where the last request was: that request wins again
                control.current = last.generation;
                self.inner.set_phase(if last.done {
                    ViewportPhase::Idle
                } else {
                    ViewportPhase::Fetching
                });
                tracing::trace!(generation = last.generation, "Camera movement below threshold");
                return;
            }
        }

        control.next_generation += 1;
        let generation = control.next_generation;
        control.current = generation;
        self.inner.set_phase(ViewportPhase::PendingDebounce);

        let inner = Arc::clone(&self.inner);
        control.tasks.push(tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            // Errors are published on the state channel
            let _ = run_fetch(&inner, generation, camera).await;
        }));
    }

    /// Fetch for `camera` right away, skipping debounce and the movement check.
    ///
    /// Supersedes any pending or in-flight request.
    pub async fn refresh_now(&self, camera: CameraPosition) -> Result<()> {
        let generation = {
            let mut control = self.inner.lock();
            control.next_generation += 1;
            control.current = control.next_generation;
            control.current
        };
        run_fetch(&self.inner, generation, camera).await
    }

    /// Abort pending work. Later results from in-flight requests are dropped.
    pub fn shutdown(&self) {
        let mut control = self.inner.lock();
        for task in control.tasks.drain(..) {
            task.abort();
        }
        control.next_generation += 1;
        control.current = control.next_generation;
        control.last = None;
        self.inner.set_phase(ViewportPhase::Idle);
        tracing::debug!("Viewport controller shut down");
    }
}

async fn run_fetch(inner: &Inner, generation: u64, camera: CameraPosition) -> Result<()> {
    let bbox = camera.visible;
    {
        let mut control = inner.lock();
        if control.current != generation {
            tracing::trace!(generation, "Debounced request superseded");
            return Ok(());
        }
        control.last = Some(LastRequest {
            bbox,
            generation,
            done: false,
        });
        inner.set_phase(ViewportPhase::Fetching);
    }

    let max_rows = max_rows_for_zoom(camera.zoom);
    tracing::debug!(generation, bbox = %bbox, max_rows, "Fetching viewport spots");
    let result = inner.source.fetch_in_bbox(&bbox, max_rows).await;

    let mut control = inner.lock();
    if control.current != generation {
        // Nothing will publish for this box now, so settling back on it must refetch
        if control.last.is_some_and(|last| last.generation == generation) {
            control.last = None;
        }
        tracing::debug!(generation, current = control.current, "Dropping stale viewport result");
        return Ok(());
    }

    match result {
        Ok(spots) => {
            if let Some(last) = control.last.as_mut() {
                last.done = true;
            }
            tracing::debug!(generation, count = spots.len(), "Viewport updated");
            inner.state.send_replace(ViewportSnapshot {
                phase: ViewportPhase::Idle,
                spots,
                bbox: Some(bbox),
                error: None,
            });
            Ok(())
        }
        Err(e) => {
            // Forget the box so the next settle retries it
            control.last = None;
            tracing::warn!(generation, bbox = %bbox, error = %e, "Viewport fetch failed");
            inner.state.send_modify(|s| {
                s.phase = ViewportPhase::Idle;
                s.error = Some(e.user_message());
            });
            Err(e)
        }
    }
}
