//! In-memory scripted driver
//!
//! Plays back a queue of capture outcomes against a configurable device list.
//! Clones share state, so a test can keep a handle after handing the driver
//! to a [`DeviceRegistry`](crate::device::DeviceRegistry).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use super::{CameraDriver, DriverError};
use crate::device::Device;

/// Minimal JPEG start/end markers, returned when no outcome is scripted
const PLACEHOLDER_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

/// Result of one scripted capture call
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// Return these bytes
    Image(Bytes),
    /// Fail with a driver error carrying this message
    Fail(String),
    /// Never complete (exercises capture timeouts)
    Hang,
}

#[derive(Debug, Default)]
struct Inner {
    devices: Mutex<Vec<Device>>,
    outcomes: Mutex<VecDeque<CaptureOutcome>>,
    enumerate_error: Mutex<Option<String>>,
    latency: Mutex<Duration>,
    captures: AtomicUsize,
    enumerations: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Scripted camera driver
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    inner: Arc<Inner>,
}

impl ScriptedDriver {
    /// Create a driver with no attached devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver reporting the given devices
    pub fn with_devices(devices: Vec<Device>) -> Self {
        let driver = Self::new();
        driver.set_devices(devices);
        driver
    }

    /// Replace the devices reported by the next enumeration
    pub fn set_devices(&self, devices: Vec<Device>) {
        *lock(&self.inner.devices) = devices;
    }

    /// Make enumeration fail (or succeed again with `None`)
    pub fn set_enumerate_error(&self, error: Option<String>) {
        *lock(&self.inner.enumerate_error) = error;
    }

    /// Simulated duration of every capture
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.inner.latency) = latency;
    }

    /// Queue an outcome for a future capture call
    pub fn push_outcome(&self, outcome: CaptureOutcome) {
        lock(&self.inner.outcomes).push_back(outcome);
    }

    /// Queue `count` successful captures
    pub fn push_images(&self, count: usize) {
        let mut outcomes = lock(&self.inner.outcomes);
        for i in 0..count {
            outcomes.push_back(CaptureOutcome::Image(Bytes::from(vec![0xFF, 0xD8, i as u8])));
        }
    }

    /// Total capture calls made
    pub fn capture_count(&self) -> usize {
        self.inner.captures.load(Ordering::SeqCst)
    }

    /// Total enumeration calls made
    pub fn enumerate_count(&self) -> usize {
        self.inner.enumerations.load(Ordering::SeqCst)
    }

    /// Highest number of driver calls observed running at once
    pub fn peak_concurrency(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.inner.in_flight)
    }
}

impl CameraDriver for ScriptedDriver {
    async fn enumerate(&self) -> Result<Vec<Device>, DriverError> {
        let _guard = self.enter();
        self.inner.enumerations.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = lock(&self.inner.enumerate_error).clone() {
            return Err(DriverError::Other(message));
        }

        Ok(lock(&self.inner.devices).clone())
    }

    async fn capture_and_download(&self, device: &Device) -> Result<Bytes, DriverError> {
        let _guard = self.enter();
        self.inner.captures.fetch_add(1, Ordering::SeqCst);

        let latency = *lock(&self.inner.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if !lock(&self.inner.devices).iter().any(|d| d.port == device.port) {
            return Err(DriverError::Disconnected);
        }

        let outcome = lock(&self.inner.outcomes).pop_front();
        match outcome {
            Some(CaptureOutcome::Image(data)) => Ok(data),
            Some(CaptureOutcome::Fail(message)) => Err(DriverError::Other(message)),
            Some(CaptureOutcome::Hang) => std::future::pending().await,
            None => Ok(Bytes::from_static(PLACEHOLDER_JPEG)),
        }
    }
}

/// Decrements the in-flight counter when dropped, including on cancellation
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
