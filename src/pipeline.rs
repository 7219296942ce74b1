use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::error::Result;
use crate::core::model::{
    Classification, ClassificationResult, ExtraFeatures, Language, LayoutFeatures, OcrStatus,
    RuleContribution, ScoreResult, TextAnalysis,
};
use crate::core::profile::{CalibrationProfile, Feature};
use crate::core::scorer::HeuristicScorer;
use crate::ocr::preprocess::DEFAULT_MAX_WIDTH;
use crate::ocr::{OcrCache, OcrEngine, DEFAULT_OCR_LANGUAGE, DEFAULT_OCR_TIMEOUT};
use crate::text::{ComplianceParams, TextContentAnalyzer};
use crate::vision::components::DEFAULT_MIN_COMPONENT_AREA;
use crate::vision::{
    BinaryMaskExtractor, ComponentGeometryAnalyzer, RasterDocument, StructuralSegmenter,
};

/// Signals named in the explanation.
const EXPLAINED_SIGNALS: usize = 3;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub profile: CalibrationProfile,
    pub compliance: ComplianceParams,
    pub min_component_area: u32,
    pub ocr_timeout: Duration,
    pub ocr_max_width: u32,
    pub ocr_language: String,
}

impl PipelineConfig {
    pub fn new(profile: CalibrationProfile) -> Self {
        Self {
            profile,
            compliance: ComplianceParams::default(),
            min_component_area: DEFAULT_MIN_COMPONENT_AREA,
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            ocr_max_width: DEFAULT_MAX_WIDTH,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
        }
    }

    pub fn with_compliance(mut self, compliance: ComplianceParams) -> Self {
        self.compliance = compliance;
        self
    }

    pub fn with_min_component_area(mut self, min_area: u32) -> Self {
        self.min_component_area = min_area;
        self
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(CalibrationProfile::canonical())
    }
}

/// Binarize, measure, segment, score and, for articles, read the text.
///
/// OCR is a capability fixed at construction: without a text analyzer,
/// articles are reported with label and score only.
#[derive(Debug, Clone)]
pub struct ClassificationPipeline {
    config: PipelineConfig,
    extractor: BinaryMaskExtractor,
    geometry: ComponentGeometryAnalyzer,
    segmenter: StructuralSegmenter,
    scorer: HeuristicScorer,
    text: Option<TextContentAnalyzer>,
}

impl ClassificationPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let geometry = ComponentGeometryAnalyzer::new()
            .with_min_area(config.min_component_area)
            .with_column_detection(config.profile.uses(Feature::NumColumns));
        Self {
            extractor: BinaryMaskExtractor::new(),
            geometry,
            segmenter: StructuralSegmenter::new(),
            scorer: HeuristicScorer::new(config.profile.clone()),
            text: None,
            config,
        }
    }

    /// Enables text analysis with the configured timeout, width and language.
    pub fn with_ocr(self, engine: Arc<dyn OcrEngine>, cache: Arc<dyn OcrCache>) -> Self {
        let analyzer = TextContentAnalyzer::new(engine, cache)
            .with_timeout(self.config.ocr_timeout)
            .with_max_width(self.config.ocr_max_width)
            .with_language(self.config.ocr_language.clone());
        self.with_text_analyzer(analyzer)
    }

    pub fn with_text_analyzer(mut self, analyzer: TextContentAnalyzer) -> Self {
        self.text = Some(analyzer);
        self
    }

    pub fn has_ocr(&self) -> bool {
        self.text.is_some()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classify_path(&self, path: &Path, params: &ComplianceParams) -> Result<ClassificationResult> {
        let raster = RasterDocument::open(path)?;
        Ok(self.classify(&raster, params))
    }

    pub fn classify_bytes(
        &self,
        bytes: &[u8],
        hint: Option<&Path>,
        params: &ComplianceParams,
    ) -> Result<ClassificationResult> {
        let raster = RasterDocument::decode(bytes, hint)?;
        Ok(self.classify(&raster, params))
    }

    /// Every stage after decoding degrades instead of failing.
    pub fn classify(&self, raster: &RasterDocument, params: &ComplianceParams) -> ClassificationResult {
        let language = params.language;
        let mut warnings = Vec::new();

        let mask = self.extractor.extract(raster);
        let (geometry, _rows) = self.geometry.analyze(&mask);

        let segmentation = match self.segmenter.segment(&mask) {
            Ok(segmentation) => Some(segmentation),
            Err(err) => {
                warn!(%err, "segmentation failed, counting zero lines");
                warnings.push(
                    match language {
                        Language::En => "structural segmentation failed; lines and paragraphs counted as zero",
                        Language::Pt => "segmentação estrutural falhou; linhas e parágrafos contados como zero",
                    }
                    .to_string(),
                );
                None
            }
        };
        // No lines means nothing for the line-count rule to measure.
        let line_count = segmentation
            .as_ref()
            .map(|s| s.lines.len())
            .filter(|&lines| lines > 0);
        let (num_lines, num_paragraphs) = segmentation
            .as_ref()
            .map(|s| (s.lines.len(), s.paragraphs.len()))
            .unwrap_or((0, 0));

        let score = self.scorer.score(&geometry, line_count);
        debug!(score = score.score, "scored geometry");

        let text = match (score.classification, &self.text) {
            (Classification::ScientificArticle, Some(analyzer)) => {
                let analysis = analyzer.analyze(raster, num_paragraphs, params);
                if matches!(analysis.ocr_status, OcrStatus::TimedOut | OcrStatus::Failed) {
                    if let Some(reason) = analysis.issues.first() {
                        warnings.push(reason.clone());
                    }
                }
                Some(analysis)
            }
            (Classification::ScientificArticle, None) => {
                warnings.push(
                    match language {
                        Language::En => "no OCR engine configured; text analysis skipped",
                        Language::Pt => "nenhum motor de OCR configurado; análise de texto ignorada",
                    }
                    .to_string(),
                );
                None
            }
            (Classification::Advertisement, _) => None,
        };

        let explanation = explain(&score, text.as_ref(), num_paragraphs, language);
        info!(
            classification = %score.classification,
            score = score.score,
            confidence = score.confidence,
            "classified page"
        );

        let (word_count, frequent_words, is_compliant, compliance_issues, ocr_status) = match text {
            Some(analysis) => (
                Some(analysis.word_count),
                analysis.frequent_words,
                Some(analysis.is_compliant),
                analysis.issues,
                Some(analysis.ocr_status),
            ),
            None => (None, Vec::new(), None, Vec::new(), None),
        };

        ClassificationResult {
            classification: score.classification,
            score: score.score,
            confidence: score.confidence,
            profile: self.scorer.profile().id(),
            features: LayoutFeatures::from(&geometry),
            extra_features: ExtraFeatures::from(&geometry),
            num_lines,
            num_paragraphs,
            word_count,
            frequent_words,
            is_compliant,
            compliance_issues,
            ocr_status,
            warnings,
            explanation,
        }
    }
}

fn explain(
    score: &ScoreResult,
    text: Option<&TextAnalysis>,
    num_paragraphs: usize,
    language: Language,
) -> String {
    let verdict = score.classification;
    let mut out = match language {
        Language::En => format!(
            "Classified as {} (score {:+.2}, confidence {:.0}%).",
            verdict.localized(language),
            score.score,
            score.confidence * 100.0
        ),
        Language::Pt => format!(
            "Classificado como {} (pontuação {:+.2}, confiança {:.0}%).",
            verdict.localized(language),
            score.score,
            score.confidence * 100.0
        ),
    };

    let toward_advertisement = verdict == Classification::Advertisement;
    let mut drivers: Vec<&RuleContribution> = score
        .contributions
        .iter()
        .filter(|c| (c.delta > 0.0) == toward_advertisement)
        .collect();
    drivers.sort_by(|a, b| b.delta.abs().total_cmp(&a.delta.abs()));
    drivers.truncate(EXPLAINED_SIGNALS);

    if !drivers.is_empty() {
        let cues = drivers
            .iter()
            .map(|c| describe(c, language))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(match language {
            Language::En => " Main signals: ",
            Language::Pt => " Principais sinais: ",
        });
        out.push_str(&cues);
        out.push('.');
    }

    if let Some(text) = text {
        let verdict = match (text.is_compliant, language) {
            (true, Language::En) => "compliant".to_string(),
            (true, Language::Pt) => "conforme".to_string(),
            (false, Language::En) => format!("not compliant: {}", text.issues.join("; ")),
            (false, Language::Pt) => format!("não conforme: {}", text.issues.join("; ")),
        };
        out.push_str(&match language {
            Language::En => format!(
                " Text analysis: {} words, {} paragraphs; {verdict}.",
                text.word_count, num_paragraphs
            ),
            Language::Pt => format!(
                " Análise de texto: {} palavras, {} parágrafos; {verdict}.",
                text.word_count, num_paragraphs
            ),
        });
    }
    out
}

fn describe(contribution: &RuleContribution, language: Language) -> String {
    let relation = if contribution.value > contribution.threshold {
        ">"
    } else if contribution.value < contribution.threshold {
        "<"
    } else {
        "="
    };
    let precision = if contribution.feature == Feature::TextDensity {
        3
    } else {
        2
    };
    format!(
        "{} {:.*} {relation} {}",
        contribution.feature.label(language),
        precision,
        contribution.value,
        contribution.threshold
    )
}
