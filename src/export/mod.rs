pub mod json_export;
pub mod text_export;

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::model::ClassificationResult;

pub use json_export::JsonExporter;
pub use text_export::TextExporter;

/// A classification together with the file it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub source: PathBuf,
    #[serde(flatten)]
    pub result: ClassificationResult,
}

impl PageReport {
    pub fn new(source: PathBuf, result: ClassificationResult) -> Self {
        Self { source, result }
    }

    /// File stem used to name exported files; falls back to `page`.
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string())
    }
}

pub trait Exporter {
    /// Writes the report and returns the path written.
    fn export(&self, report: &PageReport) -> Result<PathBuf>;
}

fn output_path(out_dir: &Path, report: &PageReport, extension: &str) -> PathBuf {
    out_dir.join(format!("{}.{extension}", report.stem()))
}
