//! Device registry implementation

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use super::config::{RediscoveryPolicy, RegistryConfig};
use super::error::CameraError;
use super::policy::select_preferred;
use super::types::Device;
use crate::driver::{CameraDriver, DriverError};

/// How the active device was chosen by a discovery cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// A preferred brand matched
    Preferred,
    /// No brand matched; the first device was used
    Fallback,
    /// The operator's manual selection was kept
    Preserved,
    /// Nothing attached; no active device
    None,
}

/// Outcome of one discovery cycle
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    /// Number of devices enumerated
    pub device_count: usize,
    /// Active device after discovery
    pub active: Option<Device>,
    /// How the active device was chosen
    pub selection: Selection,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Latest discovery snapshot, in driver order
    known: Vec<Device>,
    /// Port of the active device, resolved against `known` on read
    active_port: Option<String>,
    /// Whether `active_port` came from `select_by_port`
    manual: bool,
}

impl RegistryState {
    fn find(&self, port: &str) -> Option<&Device> {
        self.known.iter().find(|device| device.port == port)
    }

    fn active(&self) -> Option<&Device> {
        self.active_port.as_deref().and_then(|port| self.find(port))
    }

    /// Install a fresh snapshot and pick the active device
    fn replace(&mut self, devices: Vec<Device>, policy: RediscoveryPolicy) -> DiscoveryReport {
        self.known = devices;

        let keep_manual = policy == RediscoveryPolicy::PreserveManual
            && self.manual
            && self.active().is_some();

        let selection = if keep_manual {
            Selection::Preserved
        } else {
            self.manual = false;
            match select_preferred(&self.known) {
                Some((device, matched)) => {
                    self.active_port = Some(device.port.clone());
                    if matched {
                        Selection::Preferred
                    } else {
                        Selection::Fallback
                    }
                }
                None => {
                    self.active_port = None;
                    Selection::None
                }
            }
        };

        DiscoveryReport {
            device_count: self.known.len(),
            active: self.active().cloned(),
            selection,
        }
    }
}

/// Registry of discovered cameras and the active selection
///
/// Discovery and capture share `driver`; holding that mutex is the only way
/// to reach the device. Lock order is always driver, then state.
pub struct DeviceRegistry<D: CameraDriver> {
    driver: Arc<Mutex<D>>,
    state: RwLock<RegistryState>,
    config: RegistryConfig,
}

impl<D: CameraDriver> DeviceRegistry<D> {
    /// Create a registry with default configuration
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(driver: D, config: RegistryConfig) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
            state: RwLock::new(RegistryState::default()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Exclusive-access guard around the driver
    pub(crate) fn driver(&self) -> &Arc<Mutex<D>> {
        &self.driver
    }

    /// Enumerate devices and refresh the active selection
    ///
    /// The snapshot is replaced wholesale. An empty result clears the active
    /// device and is logged, not returned as an error. A failed or timed-out
    /// enumeration keeps the previous snapshot.
    pub async fn discover(&self) -> Result<DiscoveryReport, DriverError> {
        let driver = self.driver.lock().await;

        let devices = match tokio::time::timeout(self.config.discovery_timeout, driver.enumerate())
            .await
        {
            Ok(Ok(devices)) => devices,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Camera enumeration failed");
                return Err(e);
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.discovery_timeout.as_millis() as u64,
                    "Camera enumeration timed out"
                );
                return Err(DriverError::Other(format!(
                    "enumeration timed out after {:?}",
                    self.config.discovery_timeout
                )));
            }
        };

        let mut state = self.state.write().await;
        let report = state.replace(devices, self.config.rediscovery);
        drop(state);
        drop(driver);

        match (&report.active, report.selection) {
            (None, _) => tracing::warn!("No camera detected"),
            (Some(device), Selection::Fallback) => tracing::info!(
                model = %device.model,
                port = %device.port,
                devices = report.device_count,
                "No Canon, Sony or Nikon camera detected, using first available camera"
            ),
            (Some(device), selection) => tracing::info!(
                model = %device.model,
                port = %device.port,
                devices = report.device_count,
                ?selection,
                "Camera detected"
            ),
        }

        Ok(report)
    }

    /// Make the device on `port` active
    ///
    /// Fails with `DeviceNotFound` (leaving the selection unchanged) when the
    /// port is not in the latest snapshot.
    pub async fn select_by_port(&self, port: &str) -> Result<Device, CameraError> {
        let mut state = self.state.write().await;

        let device = state
            .find(port)
            .cloned()
            .ok_or_else(|| CameraError::DeviceNotFound(port.to_string()))?;

        state.active_port = Some(device.port.clone());
        state.manual = true;

        tracing::info!(model = %device.model, port = %device.port, "Camera selected");

        Ok(device)
    }

    /// Devices from the latest discovery, in driver order
    pub async fn list_devices(&self) -> Vec<Device> {
        self.state.read().await.known.clone()
    }

    /// The active device, if any
    pub async fn active(&self) -> Option<Device> {
        self.state.read().await.active().cloned()
    }

    /// Whether a device is active
    pub async fn is_active(&self) -> bool {
        self.state.read().await.active().is_some()
    }

    /// Whether the active device was chosen explicitly
    pub async fn is_manual_selection(&self) -> bool {
        self.state.read().await.manual
    }

    /// Look up a port in the latest snapshot
    pub async fn resolve(&self, port: &str) -> Result<Device, CameraError> {
        self.state
            .read()
            .await
            .find(port)
            .cloned()
            .ok_or_else(|| CameraError::DeviceVanished(port.to_string()))
    }

    /// Resolve the active device against the latest snapshot
    pub async fn resolve_active(&self) -> Result<Device, CameraError> {
        let state = self.state.read().await;
        let port = state
            .active_port
            .as_deref()
            .ok_or(CameraError::NoActiveDevice)?;

        state
            .find(port)
            .cloned()
            .ok_or_else(|| CameraError::DeviceVanished(port.to_string()))
    }

    /// Spawn a background task that rediscovers on a fixed interval
    ///
    /// The first run happens one interval from now; startup discovery is the
    /// caller's job. Returns a handle that can be used to abort the task.
    pub fn spawn_discovery_task(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                // Failures are logged inside discover()
                let _ = registry.discover().await;
            }
        })
    }
}
