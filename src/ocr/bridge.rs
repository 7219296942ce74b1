use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::{GrayImage, ImageFormat};
use tracing::{debug, warn};

use crate::core::error::{ClassifyError, Result};
use crate::ocr::{OcrEngine, OcrRequest};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs the `tesseract` CLI on a temporary PNG and reads text from stdout.
#[derive(Debug, Clone)]
pub struct TesseractBridge {
    binary: PathBuf,
    work_dir: Option<PathBuf>,
}

impl TesseractBridge {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            work_dir: None,
        }
    }

    pub fn with_binary(mut self, binary: PathBuf) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = Some(work_dir);
        self
    }

    /// Checks that the binary starts; returns its version line.
    pub fn probe(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .map_err(|err| {
                ClassifyError::OcrUnavailable(format!("cannot run {}: {err}", self.binary.display()))
            })?;
        if !output.status.success() {
            return Err(ClassifyError::OcrUnavailable(format!(
                "{} --version exited with {}",
                self.binary.display(),
                output.status
            )));
        }
        // Older releases print the version on stderr.
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&text)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn stage_bitmap(&self, bitmap: &GrayImage) -> Result<tempfile::NamedTempFile> {
        let staging_error = |err: io::Error| ClassifyError::Ocr(format!("cannot stage bitmap: {err}"));
        let mut builder = tempfile::Builder::new();
        builder.prefix("docsort-ocr-").suffix(".png");
        let file = match &self.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(staging_error)?;
                builder.tempfile_in(dir)
            }
            None => builder.tempfile(),
        }
        .map_err(staging_error)?;

        bitmap
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|err| ClassifyError::Ocr(format!("cannot encode bitmap: {err}")))?;
        Ok(file)
    }
}

impl Default for TesseractBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractBridge {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, bitmap: &GrayImage, request: &OcrRequest) -> Result<String> {
        let staged = self.stage_bitmap(bitmap)?;
        let mut child = Command::new(&self.binary)
            .arg(staged.path())
            .arg("stdout")
            .args(["-l", request.language.as_str(), "--oem", "3", "--psm", "1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => ClassifyError::OcrUnavailable(format!(
                    "{} not found",
                    self.binary.display()
                )),
                _ => ClassifyError::Ocr(format!("failed to spawn tesseract: {err}")),
            })?;

        // Drain stdout concurrently so a full pipe cannot stall the child.
        let stdout_reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).map(|_| buf)
            })
        });

        let status = wait_with_deadline(&mut child, request.timeout)?;
        let stdout = match stdout_reader {
            Some(handle) => handle
                .join()
                .map_err(|_| ClassifyError::Ocr("stdout reader panicked".to_string()))?
                .map_err(|err| ClassifyError::Ocr(format!("cannot read tesseract output: {err}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            return Err(ClassifyError::Ocr(format!(
                "tesseract exited with {status}: {}",
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&stdout).into_owned();
        debug!(chars = text.len(), "tesseract finished");
        Ok(text)
    }
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                warn!(?timeout, "killing tesseract after timeout");
                let _ = child.kill();
                let _ = child.wait();
                return Err(ClassifyError::OcrTimeout(timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(ClassifyError::Ocr(format!("cannot wait for tesseract: {err}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn missing_binary_is_unavailable() {
        let bridge = TesseractBridge::new().with_binary(PathBuf::from("/nonexistent/tesseract"));
        assert!(matches!(bridge.probe(), Err(ClassifyError::OcrUnavailable(_))));

        let bitmap = GrayImage::from_pixel(8, 8, Luma([255]));
        let result = bridge.recognize(&bitmap, &OcrRequest::default());
        assert!(matches!(result, Err(ClassifyError::OcrUnavailable(_))));
    }

    #[test]
    fn stages_png_in_work_dir() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let bridge = TesseractBridge::new().with_work_dir(dir.path().join("ocr"));
        let staged = bridge.stage_bitmap(&GrayImage::from_pixel(4, 4, Luma([0])))?;
        assert!(staged.path().starts_with(dir.path()));
        let decoded = image::open(staged.path())?.to_luma8();
        assert_eq!(decoded.dimensions(), (4, 4));
        Ok(())
    }

    #[test]
    #[ignore] // needs a tesseract binary on PATH
    fn recognizes_with_installed_tesseract() {
        let bridge = TesseractBridge::new();
        bridge.probe().unwrap();
        let bitmap = GrayImage::from_pixel(64, 64, Luma([255]));
        let text = bridge.recognize(&bitmap, &OcrRequest::default()).unwrap();
        assert!(text.trim().is_empty());
    }
}
