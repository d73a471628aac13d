//! Image text recognition through an external `tesseract` executable.

use crate::error::ExtractError;
use image::ImageFormat;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

pub struct OcrEngine {
    command: PathBuf,
    timeout: Duration,
}

impl OcrEngine {
    pub fn new(command: PathBuf, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    pub async fn recognize(&self, path: &Path) -> Result<String, ExtractError> {
        let normalized = normalize_image(path)?;

        debug!(
            path = %path.display(),
            command = %self.command.display(),
            timeout_secs = self.timeout.as_secs(),
            "running ocr"
        );

        let mut command = Command::new(&self.command);
        command
            .arg(normalized.path())
            .arg("stdout")
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => return Err(ExtractError::OcrTimeout(self.timeout)),
            Ok(Err(error)) if error.kind() == ErrorKind::NotFound => {
                return Err(ExtractError::OcrUnavailable(format!(
                    "{} not found; install tesseract or set TESSERACT_CMD",
                    self.command.display()
                )))
            }
            Ok(Err(error)) => return Err(ExtractError::OcrFailed(error.to_string())),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::OcrFailed(format!(
                "{}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Decodes the upload and re-encodes it as 8-bit RGB PNG for the OCR engine.
fn normalize_image(path: &Path) -> Result<NamedTempFile, ExtractError> {
    let decoded = image::open(path)?;
    let rgb = decoded.to_rgb8();

    let file = tempfile::Builder::new()
        .prefix("studygenie-ocr-")
        .suffix(".png")
        .tempfile()?;
    rgb.save_with_format(file.path(), ImageFormat::Png)?;
    Ok(file)
}
