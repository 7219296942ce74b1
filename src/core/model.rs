use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Advertisement,
    ScientificArticle,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Advertisement => "advertisement",
            Classification::ScientificArticle => "scientific_article",
        }
    }

    pub fn localized(&self, language: Language) -> &'static str {
        match (self, language) {
            (Classification::Advertisement, Language::En) => "advertisement",
            (Classification::Advertisement, Language::Pt) => "anúncio",
            (Classification::ScientificArticle, Language::En) => "scientific article",
            (Classification::ScientificArticle, Language::Pt) => "artigo científico",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language of user-facing messages. Never affects thresholds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pt" => Ok(Language::Pt),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language '{other}' (expected pt or en)")),
        }
    }
}

/// One connected region of foreground pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    pub bbox: BBox,
    pub area: u32,
    pub centroid: (f64, f64),
}

/// Aggregate shape statistics over the components that survive the area filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryFeatures {
    pub num_components: usize,
    pub avg_height: f64,
    pub height_std: f64,
    pub avg_width: f64,
    pub avg_aspect_ratio: f64,
    pub text_density: f64,
    pub layout_transitions: usize,
    /// Only measured when the active calibration profile votes on it.
    pub num_columns: Option<usize>,
}

/// Per-row (or per-column) foreground sums normalized by their maximum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionProfile {
    values: Vec<f64>,
}

impl ProjectionProfile {
    pub fn from_counts(counts: &[u32]) -> Self {
        let max = counts.iter().copied().max().unwrap_or(0);
        let values = if max == 0 {
            vec![0.0; counts.len()]
        } else {
            counts.iter().map(|&c| c as f64 / max as f64).collect()
        };
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of adjacent pairs whose absolute difference exceeds `delta`.
    pub fn transitions(&self, delta: f64) -> usize {
        self.values
            .windows(2)
            .filter(|pair| (pair[1] - pair[0]).abs() > delta)
            .count()
    }

    /// Maximal runs of entries strictly above `threshold`, as `[start, end)` ranges.
    pub fn runs_above(&self, threshold: f64) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut start = None;
        for (idx, &value) in self.values.iter().enumerate() {
            match (value > threshold, start) {
                (true, None) => start = Some(idx),
                (false, Some(s)) => {
                    runs.push((s, idx));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push((s, self.values.len()));
        }
        runs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLine {
    pub y_start: u32,
    /// Exclusive.
    pub y_end: u32,
    pub height: u32,
    pub left: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub lines: Vec<TextLine>,
}

impl Paragraph {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// How much one calibration rule moved the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleContribution {
    pub feature: crate::core::profile::Feature,
    pub value: f64,
    pub threshold: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub classification: Classification,
    pub confidence: f64,
    pub contributions: Vec<RuleContribution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequentWord {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrStatus {
    Recognized,
    Cached,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub word_count: usize,
    pub frequent_words: Vec<FrequentWord>,
    pub is_compliant: bool,
    pub issues: Vec<String>,
    pub ocr_status: OcrStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutFeatures {
    pub text_density: f64,
    pub num_text_components: usize,
    pub layout_transitions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraFeatures {
    pub avg_component_height: f64,
    pub height_std: f64,
    pub avg_component_width: f64,
    pub avg_aspect_ratio: f64,
    pub num_columns_detected: usize,
}

impl From<&GeometryFeatures> for LayoutFeatures {
    fn from(geometry: &GeometryFeatures) -> Self {
        Self {
            text_density: geometry.text_density,
            num_text_components: geometry.num_components,
            layout_transitions: geometry.layout_transitions,
        }
    }
}

impl From<&GeometryFeatures> for ExtraFeatures {
    fn from(geometry: &GeometryFeatures) -> Self {
        Self {
            avg_component_height: geometry.avg_height,
            height_std: geometry.height_std,
            avg_component_width: geometry.avg_width,
            avg_aspect_ratio: geometry.avg_aspect_ratio,
            num_columns_detected: geometry.num_columns.unwrap_or(0),
        }
    }
}

/// Record handed to the API layer for one classified page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub score: f64,
    pub confidence: f64,
    pub profile: String,
    pub features: LayoutFeatures,
    pub extra_features: ExtraFeatures,
    pub num_lines: usize,
    pub num_paragraphs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frequent_words: Vec<FrequentWord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_compliant: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance_issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_status: Option<OcrStatus>,
    /// Degraded stages, one message per stage that fell back.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_projection_by_maximum() {
        let profile = ProjectionProfile::from_counts(&[0, 5, 10, 5]);
        assert_eq!(profile.values(), &[0.0, 0.5, 1.0, 0.5]);
        assert_eq!(profile.transitions(0.1), 3);
    }

    #[test]
    fn empty_projection_stays_zero() {
        let profile = ProjectionProfile::from_counts(&[0, 0, 0]);
        assert_eq!(profile.values(), &[0.0, 0.0, 0.0]);
        assert_eq!(profile.transitions(0.1), 0);
        assert!(profile.runs_above(0.03).is_empty());
    }

    #[test]
    fn finds_runs_including_trailing_one() {
        let profile = ProjectionProfile::from_counts(&[1, 1, 0, 0, 1]);
        assert_eq!(profile.runs_above(0.03), vec![(0, 2), (4, 5)]);
    }

    #[test]
    fn parses_language_codes() {
        assert_eq!("EN".parse::<Language>(), Ok(Language::En));
        assert_eq!(" pt ".parse::<Language>(), Ok(Language::Pt));
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn classification_serializes_snake_case() {
        let json = serde_json::to_string(&Classification::ScientificArticle).unwrap();
        assert_eq!(json, "\"scientific_article\"");
    }
}
