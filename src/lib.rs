//! Layout-based classification of scanned pages into advertisements and
//! scientific articles, with OCR-backed text statistics for articles.

pub mod core;
pub mod export;
pub mod ocr;
pub mod pipeline;
pub mod text;
pub mod vision;

pub use core::error::{ClassifyError, Result};
pub use core::model::{Classification, ClassificationResult, Language};
pub use pipeline::{ClassificationPipeline, PipelineConfig};
