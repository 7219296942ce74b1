use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::GrayImage;
use tracing::{debug, warn};

use crate::core::error::{ClassifyError, Result};
use crate::core::model::{Language, OcrStatus, TextAnalysis};
use crate::ocr::{OcrCache, OcrEngine, OcrPreprocessor, OcrRequest};
use crate::text::compliance::{check_compliance, ComplianceParams};
use crate::text::words::{count_words, frequent_words, TOP_WORDS};
use crate::vision::raster::RasterDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    pub text: String,
    pub cached: bool,
}

/// OCR-backed word statistics with a content-addressed cache in front of the
/// engine.
#[derive(Clone)]
pub struct TextContentAnalyzer {
    engine: Arc<dyn OcrEngine>,
    cache: Arc<dyn OcrCache>,
    preprocessor: OcrPreprocessor,
    request: OcrRequest,
}

impl std::fmt::Debug for TextContentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextContentAnalyzer")
            .field("engine", &self.engine.name())
            .field("preprocessor", &self.preprocessor)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl TextContentAnalyzer {
    pub fn new(engine: Arc<dyn OcrEngine>, cache: Arc<dyn OcrCache>) -> Self {
        Self {
            engine,
            cache,
            preprocessor: OcrPreprocessor::new(),
            request: OcrRequest::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = timeout;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.request.language = language.into();
        self
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.preprocessor = self.preprocessor.with_max_width(max_width);
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn timeout(&self) -> Duration {
        self.request.timeout
    }

    /// Cached text for this raster's bytes, or a fresh OCR run that is then
    /// cached. Cache failures only cost a cache miss.
    pub fn recognize(&self, raster: &RasterDocument) -> Result<Recognition> {
        let key = raster.content_hash();
        match self.cache.get(key) {
            Ok(Some(text)) => {
                debug!(key, "OCR cache hit");
                return Ok(Recognition { text, cached: true });
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "OCR cache read failed, running OCR"),
        }

        let bitmap = self.preprocessor.prepare(raster.pixels());
        let text = self.run_engine(bitmap)?;

        if let Err(err) = self.cache.put_if_absent(key, &text) {
            warn!(%err, "could not cache recognized text");
        }
        Ok(Recognition {
            text,
            cached: false,
        })
    }

    /// Never fails: OCR problems come back as a non-compliant, zero-word analysis.
    pub fn analyze(
        &self,
        raster: &RasterDocument,
        num_paragraphs: usize,
        params: &ComplianceParams,
    ) -> TextAnalysis {
        match self.recognize(raster) {
            Ok(recognition) => {
                let status = if recognition.cached {
                    OcrStatus::Cached
                } else {
                    OcrStatus::Recognized
                };
                summarize(&recognition.text, num_paragraphs, params, status)
            }
            Err(err) => {
                warn!(engine = self.engine.name(), %err, "text analysis degraded");
                degraded(&err, num_paragraphs, params)
            }
        }
    }

    // The engine runs on its own thread so a hung engine cannot outlive the
    // budget; a late result is dropped with the channel.
    fn run_engine(&self, bitmap: GrayImage) -> Result<String> {
        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let request = self.request.clone();
        thread::Builder::new()
            .name("docsort-ocr".to_string())
            .spawn(move || {
                let _ = tx.send(engine.recognize(&bitmap, &request));
            })
            .map_err(|err| ClassifyError::Ocr(format!("cannot start OCR worker: {err}")))?;

        match rx.recv_timeout(self.request.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ClassifyError::OcrTimeout(self.request.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ClassifyError::Ocr(
                "OCR worker exited without a result".to_string(),
            )),
        }
    }
}

pub fn summarize(
    text: &str,
    num_paragraphs: usize,
    params: &ComplianceParams,
    ocr_status: OcrStatus,
) -> TextAnalysis {
    let word_count = count_words(text);
    let report = check_compliance(word_count, num_paragraphs, params);
    TextAnalysis {
        word_count,
        frequent_words: frequent_words(text, TOP_WORDS),
        is_compliant: report.is_compliant,
        issues: report.issues,
        ocr_status,
    }
}

fn degraded(err: &ClassifyError, num_paragraphs: usize, params: &ComplianceParams) -> TextAnalysis {
    let (ocr_status, reason) = match (err, params.language) {
        (ClassifyError::OcrTimeout(limit), Language::En) => (
            OcrStatus::TimedOut,
            format!("text recognition timed out after {}s", limit.as_secs_f32()),
        ),
        (ClassifyError::OcrTimeout(limit), Language::Pt) => (
            OcrStatus::TimedOut,
            format!("reconhecimento de texto excedeu {}s", limit.as_secs_f32()),
        ),
        (other, Language::En) => (OcrStatus::Failed, format!("text recognition failed: {other}")),
        (other, Language::Pt) => (
            OcrStatus::Failed,
            format!("falha no reconhecimento de texto: {other}"),
        ),
    };

    let report = check_compliance(0, num_paragraphs, params);
    let mut issues = vec![reason];
    issues.extend(report.issues);
    TextAnalysis {
        word_count: 0,
        frequent_words: Vec::new(),
        is_compliant: false,
        issues,
        ocr_status,
    }
}
