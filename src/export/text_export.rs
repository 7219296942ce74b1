use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::ClassificationResult;
use crate::export::{output_path, Exporter, PageReport};

/// Plain-text summary for people skimming a batch.
#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn render(report: &PageReport) -> String {
        let result: &ClassificationResult = &report.result;
        let mut out = String::new();
        let _ = writeln!(out, "source: {}", report.source.display());
        let _ = writeln!(
            out,
            "classification: {} (score {:+.2}, confidence {:.2}, profile {})",
            result.classification, result.score, result.confidence, result.profile
        );
        let _ = writeln!(
            out,
            "layout: {} components, density {:.3}, {} transitions, {} lines, {} paragraphs",
            result.features.num_text_components,
            result.features.text_density,
            result.features.layout_transitions,
            result.num_lines,
            result.num_paragraphs
        );

        if let Some(words) = result.word_count {
            let _ = writeln!(out, "words: {words}");
        }
        if !result.frequent_words.is_empty() {
            let ranked = result
                .frequent_words
                .iter()
                .map(|w| format!("{} ({})", w.word, w.count))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "frequent words: {ranked}");
        }
        if let Some(compliant) = result.is_compliant {
            let _ = writeln!(out, "compliant: {}", if compliant { "yes" } else { "no" });
        }
        for issue in &result.compliance_issues {
            let _ = writeln!(out, "  - {issue}");
        }
        for warning in &result.warnings {
            let _ = writeln!(out, "warning: {warning}");
        }
        let _ = writeln!(out, "\n{}", result.explanation);
        out
    }
}

impl Exporter for TextExporter {
    fn export(&self, report: &PageReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("cannot create {}", self.out_dir.display()))?;
        let path = output_path(&self.out_dir, report, "txt");
        fs::write(&path, Self::render(report))
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{
        Classification, ExtraFeatures, FrequentWord, LayoutFeatures, OcrStatus,
    };

    fn article() -> PageReport {
        PageReport::new(
            PathBuf::from("paper.tiff"),
            ClassificationResult {
                classification: Classification::ScientificArticle,
                score: -13.58,
                confidence: 0.84875,
                profile: "final-v3".to_string(),
                features: LayoutFeatures {
                    text_density: 0.08,
                    num_text_components: 800,
                    layout_transitions: 40,
                },
                extra_features: ExtraFeatures {
                    avg_component_height: 8.0,
                    height_std: 0.0,
                    avg_component_width: 6.0,
                    avg_aspect_ratio: 0.75,
                    num_columns_detected: 1,
                },
                num_lines: 20,
                num_paragraphs: 1,
                word_count: Some(1200),
                frequent_words: vec![FrequentWord {
                    word: "dados".to_string(),
                    count: 31,
                }],
                is_compliant: Some(false),
                compliance_issues: vec!["only 1200 words".to_string()],
                ocr_status: Some(OcrStatus::Recognized),
                warnings: Vec::new(),
                explanation: "Classified as scientific article".to_string(),
            },
        )
    }

    #[test]
    fn renders_text_section_only_when_present() {
        let text = TextExporter::render(&article());
        assert!(text.contains("classification: scientific_article (score -13.58"));
        assert!(text.contains("frequent words: dados (31)"));
        assert!(text.contains("compliant: no\n  - only 1200 words"));
        assert!(!text.contains("warning:"));
    }

    #[test]
    fn writes_txt_next_to_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = TextExporter::new(dir.path().to_path_buf()).export(&article())?;
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("paper.txt"));
        assert!(fs::read_to_string(path)?.starts_with("source: paper.tiff"));
        Ok(())
    }
}
