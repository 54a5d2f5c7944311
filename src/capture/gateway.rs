//! Exclusive capture path

use std::sync::Arc;

use tokio::sync::MutexGuard;

use super::config::{BusyPolicy, CaptureConfig};
use super::image::CapturedImage;
use crate::device::{CameraError, Device, DeviceRegistry};
use crate::driver::CameraDriver;

/// Single entry point for captures against the device
///
/// Only one capture (still or frame) is ever in flight: the driver is
/// reached through the registry's mutex, and tokio's mutex grants waiters
/// in FIFO order.
pub struct CaptureGateway<D: CameraDriver> {
    devices: Arc<DeviceRegistry<D>>,
    config: CaptureConfig,
}

impl<D: CameraDriver> CaptureGateway<D> {
    /// Create a gateway with default configuration
    pub fn new(devices: Arc<DeviceRegistry<D>>) -> Self {
        Self::with_config(devices, CaptureConfig::default())
    }

    /// Create a gateway with custom configuration
    pub fn with_config(devices: Arc<DeviceRegistry<D>>, config: CaptureConfig) -> Self {
        Self { devices, config }
    }

    /// Get the gateway configuration
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Device registry this gateway captures from
    pub fn devices(&self) -> &Arc<DeviceRegistry<D>> {
        &self.devices
    }

    /// Capture a still on the active device
    ///
    /// The active device is resolved after the device guard is acquired, so
    /// the capture always targets the selection current at that instant.
    pub async fn capture_still(&self) -> Result<CapturedImage, CameraError> {
        if !self.devices.is_active().await {
            return Err(CameraError::NoActiveDevice);
        }

        let driver = match self.config.busy_policy {
            BusyPolicy::Queue => self.devices.driver().lock().await,
            BusyPolicy::Reject => self
                .devices
                .driver()
                .try_lock()
                .map_err(|_| CameraError::DeviceBusy)?,
        };

        let device = self.devices.resolve_active().await?;
        self.capture_locked(driver, device).await
    }

    /// Capture a live view frame on the device bound to `port`
    ///
    /// Frames always wait for the device. A port missing from the latest
    /// snapshot fails with `DeviceVanished`.
    pub async fn capture_frame(&self, port: &str) -> Result<CapturedImage, CameraError> {
        let driver = self.devices.driver().lock().await;
        let device = self.devices.resolve(port).await?;
        self.capture_locked(driver, device).await
    }

    async fn capture_locked(
        &self,
        driver: MutexGuard<'_, D>,
        device: Device,
    ) -> Result<CapturedImage, CameraError> {
        let result =
            tokio::time::timeout(self.config.timeout, driver.capture_and_download(&device)).await;
        drop(driver);

        match result {
            Ok(Ok(data)) => {
                let image = CapturedImage::jpeg(data, device);
                if image.is_empty() {
                    tracing::error!(port = %image.device.port, "Capture returned no data");
                    return Err(CameraError::CaptureFailed("camera returned an empty image".into()));
                }
                tracing::debug!(port = %image.device.port, bytes = image.len(), "Captured image");
                Ok(image)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %device.port, error = %e, "Capture failed");
                Err(CameraError::CaptureFailed(e.to_string()))
            }
            Err(_) => {
                tracing::error!(
                    port = %device.port,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Capture timed out"
                );
                Err(CameraError::CaptureFailed(format!(
                    "timed out after {:?}",
                    self.config.timeout
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::capture::JPEG_CONTENT_TYPE;
    use crate::driver::{CaptureOutcome, ScriptedDriver};

    fn nikon() -> Device {
        Device::new("Nikon D90", "usb:001")
    }

    async fn gateway_with(
        devices: Vec<Device>,
        config: CaptureConfig,
    ) -> (Arc<CaptureGateway<ScriptedDriver>>, ScriptedDriver) {
        let driver = ScriptedDriver::with_devices(devices);
        let registry = Arc::new(DeviceRegistry::new(driver.clone()));
        // Discovery failures cannot happen with the scripted driver
        let _ = registry.discover().await;
        (Arc::new(CaptureGateway::with_config(registry, config)), driver)
    }

    #[tokio::test]
    async fn test_no_active_device() {
        let (gateway, driver) = gateway_with(vec![], CaptureConfig::default()).await;
        let result = gateway.capture_still().await;
        assert!(matches!(result, Err(CameraError::NoActiveDevice)));
        assert_eq!(driver.capture_count(), 0);
    }

    #[tokio::test]
    async fn test_capture_still() {
        let (gateway, driver) = gateway_with(vec![nikon()], CaptureConfig::default()).await;
        driver.push_outcome(CaptureOutcome::Image(Bytes::from_static(b"\xFF\xD8jpeg")));

        let image = gateway.capture_still().await.unwrap();
        assert_eq!(&image.data[..], b"\xFF\xD8jpeg");
        assert_eq!(image.content_type, JPEG_CONTENT_TYPE);
        assert_eq!(image.device, nikon());
    }

    #[tokio::test]
    async fn test_driver_error_is_capture_failed() {
        let (gateway, driver) = gateway_with(vec![nikon()], CaptureConfig::default()).await;
        driver.push_outcome(CaptureOutcome::Fail("mirror stuck".into()));

        let result = gateway.capture_still().await;
        assert!(matches!(result, Err(CameraError::CaptureFailed(ref r)) if r.contains("mirror stuck")));
    }

    #[tokio::test]
    async fn test_empty_image_is_capture_failed() {
        let (gateway, driver) = gateway_with(vec![nikon()], CaptureConfig::default()).await;
        driver.push_outcome(CaptureOutcome::Image(Bytes::new()));

        let result = gateway.capture_still().await;
        assert!(matches!(result, Err(CameraError::CaptureFailed(ref r)) if r.contains("empty")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_device() {
        let config = CaptureConfig::default().timeout(Duration::from_secs(2));
        let (gateway, driver) = gateway_with(vec![nikon()], config).await;
        driver.push_outcome(CaptureOutcome::Hang);

        let result = gateway.capture_still().await;
        assert!(matches!(result, Err(CameraError::CaptureFailed(ref r)) if r.contains("timed out")));

        // Guard was released: the next capture goes through
        assert!(gateway.capture_still().await.is_ok());
    }

    #[tokio::test]
    async fn test_frame_on_vanished_port() {
        let (gateway, driver) = gateway_with(vec![nikon()], CaptureConfig::default()).await;
        driver.set_devices(vec![]);
        let _ = gateway.devices().discover().await;

        let result = gateway.capture_frame("usb:001").await;
        assert_eq!(result.unwrap_err(), CameraError::DeviceVanished("usb:001".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_captures_never_overlap() {
        let (gateway, driver) = gateway_with(vec![nikon()], CaptureConfig::default()).await;
        driver.set_latency(Duration::from_millis(50));

        let mut handles = Vec::new();
        for i in 0..8 {
            let gateway = Arc::clone(&gateway);
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    gateway.capture_still().await
                } else {
                    gateway.capture_frame("usb:001").await
                }
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(driver.capture_count(), 8);
        assert_eq!(driver.peak_concurrency(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reject_when_busy() {
        let config = CaptureConfig::default().busy_policy(BusyPolicy::Reject);
        let (gateway, driver) = gateway_with(vec![nikon()], config).await;
        driver.set_latency(Duration::from_millis(100));

        let frame = {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.capture_frame("usb:001").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let still = gateway.capture_still().await;
        assert!(matches!(still, Err(CameraError::DeviceBusy)));
        assert!(frame.await.unwrap().is_ok());

        // Idle again
        assert!(gateway.capture_still().await.is_ok());
    }
}
