//! Captured image type

use bytes::Bytes;

use crate::device::Device;

/// Content type of every captured image
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Image bytes from one capture
///
/// Cheap to clone: `Bytes` is reference counted.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Raw image data as downloaded from the camera
    pub data: Bytes,
    /// MIME type of `data`
    pub content_type: &'static str,
    /// Device the image was taken on
    pub device: Device,
}

impl CapturedImage {
    /// Create a JPEG image
    pub fn jpeg(data: Bytes, device: Device) -> Self {
        Self {
            data,
            content_type: JPEG_CONTENT_TYPE,
            device,
        }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
