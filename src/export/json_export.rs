use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::export::{output_path, Exporter, PageReport};

#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, report: &PageReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("cannot create {}", self.out_dir.display()))?;
        let path = output_path(&self.out_dir, report, "json");
        let data = serde_json::to_string_pretty(report)?;
        fs::write(&path, data).with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }
}
