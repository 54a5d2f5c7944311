//! Capture gateway
//!
//! Serializes every capture (HTTP stills and live view frames) through the
//! device registry's exclusive driver guard, bounds each driver call with a
//! timeout, and translates driver failures into [`CameraError`](crate::device::CameraError).

pub mod config;
pub mod gateway;
pub mod image;

pub use config::{BusyPolicy, CaptureConfig};
pub use gateway::CaptureGateway;
pub use image::{CapturedImage, JPEG_CONTENT_TYPE};
