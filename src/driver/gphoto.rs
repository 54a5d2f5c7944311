//! `gphoto2` command-line driver
//!
//! Runs the `gphoto2` tool as a child process for each operation. The child
//! is killed if the calling future is dropped, so a capture timeout releases
//! the device instead of leaving an orphaned process holding the USB port.

use std::path::PathBuf;
use std::process::Stdio;

use bytes::Bytes;
use tokio::process::Command;

use super::{CameraDriver, DriverError};
use crate::device::Device;

/// Default executable name, resolved through `PATH`
pub const DEFAULT_GPHOTO2: &str = "gphoto2";

/// Driver backed by the `gphoto2` CLI
#[derive(Debug, Clone)]
pub struct GphotoDriver {
    program: PathBuf,
}

impl GphotoDriver {
    /// Create a driver using `gphoto2` from `PATH`
    pub fn new() -> Self {
        Self::with_program(DEFAULT_GPHOTO2)
    }

    /// Create a driver using a specific executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Path of the executable this driver runs
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, DriverError> {
        tracing::trace!(program = %self.program.display(), ?args, "Running gphoto2");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DriverError::Command {
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(output.stdout)
    }
}

impl Default for GphotoDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver for GphotoDriver {
    async fn enumerate(&self) -> Result<Vec<Device>, DriverError> {
        let stdout = self.run(&["--auto-detect"]).await?;
        Ok(parse_auto_detect(&String::from_utf8_lossy(&stdout)))
    }

    async fn capture_and_download(&self, device: &Device) -> Result<Bytes, DriverError> {
        let stdout = self
            .run(&[
                "--camera",
                &device.model,
                "--port",
                &device.port,
                "--capture-image-and-download",
                "--stdout",
            ])
            .await?;

        if stdout.is_empty() {
            return Err(DriverError::EmptyOutput);
        }

        Ok(Bytes::from(stdout))
    }
}

/// Parse the table printed by `gphoto2 --auto-detect`
///
/// ```text
/// Model                          Port
/// ----------------------------------------------------------
/// Canon EOS 5D Mark III          usb:001,005
/// ```
///
/// The port never contains whitespace, so it is the last token of each row
/// and everything before it is the model name.
pub fn parse_auto_detect(output: &str) -> Vec<Device> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let line = line.trim();
            let (model, port) = line.rsplit_once(char::is_whitespace)?;
            let model = model.trim();
            if model.is_empty() || port.is_empty() {
                return None;
            }
            Some(Device::new(model, port))
        })
        .collect()
}
