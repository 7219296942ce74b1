pub mod bridge;
pub mod cache;
pub mod preprocess;

use std::time::Duration;

use image::GrayImage;

use crate::core::error::Result;

pub use bridge::TesseractBridge;
pub use cache::{FileCache, MemoryCache, OcrCache};
pub use preprocess::OcrPreprocessor;

pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub language: String,
    pub timeout: Duration,
}

impl Default for OcrRequest {
    fn default() -> Self {
        Self {
            language: DEFAULT_OCR_LANGUAGE.to_string(),
            timeout: DEFAULT_OCR_TIMEOUT,
        }
    }
}

/// External text recognizer. Implementations should honour `request.timeout`;
/// callers also stop waiting once it elapses.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, bitmap: &GrayImage, request: &OcrRequest) -> Result<String>;
}
