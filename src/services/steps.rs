// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bridge from a cumulative hardware step counter to a session step count.
//!
//! The first reading after `start` is the baseline; later readings report the
//! difference. No persistence and no day rollover.

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Platform step sensor.
pub trait StepSensor: Send + Sync {
    /// Begin delivering cumulative readings to `sink`.
    ///
    /// Fails with `PermissionDenied` or `SensorUnavailable`.
    fn register(&self, sink: StepSink) -> Result<()>;

    fn unregister(&self);
}

type UpdateFn = dyn Fn(u64) + Send + Sync;

struct SinkInner {
    baseline: Mutex<Option<u64>>,
    closed: AtomicBool,
    steps: watch::Sender<u64>,
    on_update: Box<UpdateFn>,
}

/// Receives readings from a [`StepSensor`].
#[derive(Clone)]
pub struct StepSink {
    inner: Arc<SinkInner>,
}

impl StepSink {
    /// Report the sensor's cumulative count. Ignored once the counter stops.
    pub fn report(&self, absolute: u64) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }

        let steps = {
            let mut baseline = self
                .inner
                .baseline
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            // A counter reset (e.g. reboot) reads below the baseline
            absolute.saturating_sub(*baseline.get_or_insert(absolute))
        };

        tracing::trace!(absolute, steps, "Step reading");
        self.inner.steps.send_replace(steps);
        (self.inner.on_update)(steps);
    }
}

/// Entry point for step counting.
pub struct StepCounter;

impl StepCounter {
    /// Register with `sensor` and start counting from zero.
    ///
    /// `on_update` is called with the session step count on every reading.
    pub fn start<F>(sensor: Arc<dyn StepSensor>, on_update: F) -> Result<StepCounterGuard>
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        let (steps, _) = watch::channel(0);
        let sink = StepSink {
            inner: Arc::new(SinkInner {
                baseline: Mutex::new(None),
                closed: AtomicBool::new(false),
                steps,
                on_update: Box::new(on_update),
            }),
        };

        if let Err(e) = sensor.register(sink.clone()) {
            tracing::warn!(error = %e, "Step counter unavailable");
            return Err(e);
        }

        tracing::info!("Step counter started");
        Ok(StepCounterGuard {
            sensor,
            sink,
            stopped: false,
        })
    }
}

/// Active registration; unregisters from the sensor on drop.
pub struct StepCounterGuard {
    sensor: Arc<dyn StepSensor>,
    sink: StepSink,
    stopped: bool,
}

impl StepCounterGuard {
    /// Session step count, updated on every reading.
    pub fn steps(&self) -> watch::Receiver<u64> {
        self.sink.inner.steps.subscribe()
    }

    pub fn current(&self) -> u64 {
        *self.sink.inner.steps.borrow()
    }

    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.sink.inner.closed.store(true, Ordering::Release);
        self.sensor.unregister();
        tracing::info!(steps = self.current(), "Step counter stopped");
    }
}

impl Drop for StepCounterGuard {
    fn drop(&mut self) {
        self.release();
    }
}
